mod common;

use common::{het_site, indel, read, ref_site};
use proptest::prelude::*;
use varscore::calls::{IndelGenotype, IndelKey};
use varscore::model::{log_odds, qscore_from_log_odds, MAX_QSCORE};
use varscore::{
    BlockPhaser, CallRecord, InMemoryReads, ModelRegistry, OverlapOutcome, PhasingOptions,
    VcfFilter,
};

fn indel_genotype() -> impl Strategy<Value = IndelGenotype> {
    prop_oneof![
        Just(IndelGenotype::NoIndel),
        Just(IndelGenotype::Het),
        Just(IndelGenotype::Hom),
    ]
}

proptest! {
    #[test]
    fn lone_deletion_ploidy_follows_genotype(
        gt in indel_genotype(),
        len in 1u32..8,
        gqx in 0i32..60,
    ) {
        let registry = ModelRegistry::default();
        let mut group = vec![indel(100, IndelKey::deletion(100, len), gt, gqx)];
        prop_assert_eq!(registry.classify_indels(&mut group).unwrap(), OverlapOutcome::Single);

        let expected = match gt {
            IndelGenotype::NoIndel => 2,
            IndelGenotype::Het => 1,
            IndelGenotype::Hom => 0,
        };
        for offset in 0..len {
            prop_assert_eq!(group[0].ploidy(offset as usize).unwrap(), expected);

            let mut site = het_site(100 + offset);
            registry.reconcile_site_with_indel(&mut site, &group[0]).unwrap();
            prop_assert_eq!(
                site.filters().contains(VcfFilter::SiteConflict),
                expected < 2,
                "offset {}", offset
            );
            prop_assert_eq!(site.smod.is_zero_ploidy, expected == 0);
        }
    }

    #[test]
    fn het_pair_ploidy_counts_covering_deletions(
        first_len in 1u32..6,
        shift in 0u32..6,
        second_len in 1u32..6,
    ) {
        let shift = shift % first_len;
        let registry = ModelRegistry::default();
        let mut group = vec![
            indel(100, IndelKey::deletion(100, first_len), IndelGenotype::Het, 30),
            indel(100 + shift, IndelKey::deletion(100 + shift, second_len), IndelGenotype::Het, 30),
        ];
        prop_assert_eq!(registry.classify_indels(&mut group).unwrap(), OverlapOutcome::HetAltPair);

        let covering = |pos: u32| {
            group
                .iter()
                .filter(|indel| indel.key.pos <= pos && pos < indel.key.end())
                .count() as u32
        };
        for offset in 0..group[0].imod.ploidy.len() {
            let pos = 100 + offset as u32;
            prop_assert_eq!(group[0].ploidy(offset).unwrap(), 2 - covering(pos));
        }
        prop_assert!(group.iter().all(|indel| !indel.filters().contains(VcfFilter::IndelConflict)));
    }

    #[test]
    fn non_het_calls_extend_only_inside_window(window in 1u32..8, gap in 1u32..10) {
        let mut phaser = BlockPhaser::new(PhasingOptions::default().with_window(window));
        let mut reads = InMemoryReads::default();
        phaser.add_site(het_site(100), &mut reads).unwrap();
        let out = phaser.add_site(ref_site(100 + gap), &mut reads).unwrap();

        let extends = gap + 1 < window;
        prop_assert_eq!(phaser.is_in_block(), extends);
        prop_assert_eq!(out.len(), if extends { 0 } else { 2 });
        if extends {
            prop_assert_eq!(phaser.block_span(), Some((100, 100)));
        }
    }

    #[test]
    fn qscore_is_bounded_and_monotone(a in -200.0f64..200.0, b in -200.0f64..200.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let q_low = qscore_from_log_odds(low);
        let q_high = qscore_from_log_odds(high);
        prop_assert!((0..=MAX_QSCORE).contains(&q_low));
        prop_assert!((0..=MAX_QSCORE).contains(&q_high));
        prop_assert!(q_low <= q_high);
        prop_assert_eq!(q_low, qscore_from_log_odds(low));
    }

    #[test]
    fn log_odds_is_order_independent(
        entries in proptest::collection::btree_map("[A-D]", -5.0f64..5.0, 1..4),
        intercept in -3.0f64..3.0,
    ) {
        let features: varscore::calls::FeatureMap =
            entries.iter().map(|(name, value)| (name.clone(), *value)).collect();
        let mut coefficients: varscore::calls::FeatureMap =
            entries.keys().map(|name| (name.clone(), 0.5)).collect();
        coefficients.insert("Intercept".into(), intercept);

        let expected = intercept + entries.values().map(|value| 0.5 * value).sum::<f64>();
        prop_assert!((log_odds(&features, &coefficients) - expected).abs() < 1e-9);
    }

    #[test]
    fn block_is_phased_only_for_balanced_diploid_reads(first in 0usize..30, second in 0usize..30) {
        let options = PhasingOptions::default();
        let mut reads = InMemoryReads::default();
        for _ in 0..first {
            reads.push(read(95, b"GGGGGACGGG", 60, 30));
        }
        for _ in 0..second {
            reads.push(read(95, b"GGGGGATGGG", 60, 30));
        }

        let mut phaser = BlockPhaser::new(options.clone());
        let mut out = phaser.add_site(het_site(100), &mut reads).unwrap();
        out.extend(phaser.add_site(het_site(101), &mut reads).unwrap());
        out.extend(phaser.finish(&mut reads).unwrap());

        let (major, minor) = (first.max(second), first.min(second));
        let expected = first + second >= options.min_spanning_reads as usize
            && minor > 0
            && minor as f64 / major as f64 >= options.min_relative_allele_frac;
        prop_assert_eq!(phaser.last_outcome().is_some_and(|o| o.is_phased()), expected);
        prop_assert_eq!(out.len(), if expected { 1 } else { 2 });
    }
}
