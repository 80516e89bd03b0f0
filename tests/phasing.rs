mod common;

use common::{called_site, het_site, read, ref_site};
use varscore::calls::Digt;
use varscore::{
    BlockPhaser, CallRecord, CallStream, InMemoryReads, ModelRegistry, PhasingOptions,
    PhasingOutcome, SiteCall, VcfFilter,
};

/// Reads starting at 95 with `allele` at reference positions 100-101.
fn spanning_reads(counts: &[(&str, usize)]) -> InMemoryReads {
    let mut reads = InMemoryReads::default();
    for (allele, count) in counts {
        let seq = format!("GGGGG{allele}GGG");
        for _ in 0..*count {
            reads.push(read(95, seq.as_bytes(), 60, 30));
        }
    }
    reads
}

fn run_block(reads: &mut InMemoryReads) -> (Vec<SiteCall>, BlockPhaser) {
    let mut phaser = BlockPhaser::default();
    let mut out = Vec::new();
    out.extend(phaser.add_site(het_site(100), reads).unwrap());
    out.extend(phaser.add_site(called_site(101, b'A', Digt::CT, 40), reads).unwrap());
    out.extend(phaser.finish(reads).unwrap());
    (out, phaser)
}

#[test]
fn imbalanced_alleles_decline_to_phase() {
    let mut reads = spanning_reads(&[("AC", 16), ("AT", 4)]);
    let (out, phaser) = run_block(&mut reads);

    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|site| site.phased_ref.is_empty()));
    assert!(out.iter().all(|site| !site.smod.is_phased_region));
    assert_eq!(
        phaser.last_outcome(),
        Some(&PhasingOutcome::AlleleImbalance {
            relative_allele_frac: 0.25
        })
    );
}

#[test]
fn balanced_alleles_emit_phased_record() {
    let mut reads = spanning_reads(&[("AC", 12), ("AT", 8)]);
    let (out, phaser) = run_block(&mut reads);

    assert_eq!(out.len(), 1);
    let record = &out[0];
    assert_eq!(record.pos, 100);
    assert_eq!(record.phased_ref, "AA");
    assert_eq!(record.phased_alt, "AC,AT");
    assert_eq!(record.phased_ad, "0,12,8");
    assert_eq!(record.genotype().unwrap(), "1/2");
    assert!(record.smod.is_phased_region);
    assert_eq!(record.n_used_calls, 20);
    assert_eq!(
        phaser.last_outcome(),
        Some(&PhasingOutcome::Phased { start: 100, end: 101 })
    );
}

#[test]
fn too_few_spanning_reads_decline() {
    let mut reads = spanning_reads(&[("AC", 5), ("AT", 4)]);
    let (out, phaser) = run_block(&mut reads);
    assert_eq!(out.len(), 2);
    assert_eq!(
        phaser.last_outcome(),
        Some(&PhasingOutcome::InsufficientReads { usable: 9 })
    );
}

#[test]
fn third_allele_breaks_diploid_block() {
    let mut reads = spanning_reads(&[("AC", 8), ("AT", 6), ("GG", 6)]);
    let (out, phaser) = run_block(&mut reads);
    assert_eq!(out.len(), 2);
    assert!(matches!(
        phaser.last_outcome(),
        Some(PhasingOutcome::NotDiploid { max_allele_frac }) if (*max_allele_frac - 0.7).abs() < 1e-12
    ));
}

#[test]
fn low_quality_reads_are_counted_unused() {
    let mut reads = spanning_reads(&[("AC", 12), ("AT", 8)]);
    for _ in 0..3 {
        reads.push(read(95, b"GGGGGACGGG", 5, 30));
    }
    reads.push(read(95, b"GGGGGATGGG", 60, 2));
    let (out, _) = run_block(&mut reads);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].n_used_calls, 20);
    assert_eq!(out[0].n_unused_calls, 4);
}

#[test]
fn non_het_calls_inside_window_extend_block() {
    let mut phaser = BlockPhaser::new(PhasingOptions::default().with_window(3));
    let mut reads = InMemoryReads::default();

    assert!(phaser.add_site(het_site(100), &mut reads).unwrap().is_empty());
    assert!(phaser.add_site(ref_site(101), &mut reads).unwrap().is_empty());
    assert!(phaser.is_in_block());
    assert_eq!(phaser.block_span(), Some((100, 100)));

    let out = phaser.add_site(ref_site(102), &mut reads).unwrap();
    assert!(!phaser.is_in_block());
    assert_eq!(out.iter().map(|s| s.pos).collect::<Vec<_>>(), vec![100, 101, 102]);
}

#[test]
fn trailing_calls_survive_a_phased_block() {
    let mut reads = spanning_reads(&[("AC", 12), ("AT", 8)]);
    let mut phaser = BlockPhaser::default();
    phaser.add_site(het_site(100), &mut reads).unwrap();
    phaser.add_site(called_site(101, b'A', Digt::CT, 40), &mut reads).unwrap();
    phaser.add_site(ref_site(102), &mut reads).unwrap();
    let out = phaser.add_site(ref_site(110), &mut reads).unwrap();

    assert_eq!(out.iter().map(|s| s.pos).collect::<Vec<_>>(), vec![100, 102, 110]);
    assert!(out[0].smod.is_phased_region);
    assert!(phaser.last_outcome().is_some_and(PhasingOutcome::is_phased));
}

#[test]
fn stream_phases_after_classification() {
    let registry = ModelRegistry::default();
    let mut stream = CallStream::new(&registry, PhasingOptions::default());
    let mut reads = spanning_reads(&[("AC", 12), ("AT", 8)]);

    let mut weak = called_site(101, b'A', Digt::CT, 12);
    weak.smod.shared.gq = 12;
    assert!(stream.push_site(het_site(100), &mut reads).unwrap().is_empty());
    assert!(stream.push_site(weak, &mut reads).unwrap().is_empty());
    let out = stream.finish(&mut reads).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].smod.shared.gqx, 12);
    assert_eq!(out[0].smod.shared.filters.render(), "LowGQX");
}

#[test]
fn unphasable_het_is_never_folded_into_a_block() {
    let mut reads = InMemoryReads::default();
    for _ in 0..12 {
        reads.push(read(95, b"GGGGGACAGG", 60, 30));
    }
    for _ in 0..8 {
        reads.push(read(95, b"GGGGGCACGG", 60, 30));
    }
    let mut middle = het_site(101);
    middle.unphasable = true;

    let mut phaser = BlockPhaser::default();
    let mut out = Vec::new();
    for site in [het_site(100), middle, het_site(102)] {
        out.extend(phaser.add_site(site, &mut reads).unwrap());
    }
    out.extend(phaser.finish(&mut reads).unwrap());

    assert_eq!(out.iter().map(|s| s.pos).collect::<Vec<_>>(), vec![100, 101, 102]);
    assert!(out.iter().all(|s| s.phased_ref.is_empty()));
    assert!(out[1].unphasable);
    assert!(out[1].filters().contains(VcfFilter::PhasingConflict));
    assert!(!out[0].filters().contains(VcfFilter::PhasingConflict));
    assert!(!out[2].filters().contains(VcfFilter::PhasingConflict));
}

#[test]
fn unphasable_call_in_window_ends_block_before_it() {
    let mut reads = spanning_reads(&[("AC", 12), ("AT", 8)]);
    let mut blocker = ref_site(102);
    blocker.unphasable = true;

    let mut phaser = BlockPhaser::default();
    let mut out = Vec::new();
    out.extend(phaser.add_site(het_site(100), &mut reads).unwrap());
    out.extend(phaser.add_site(called_site(101, b'A', Digt::CT, 40), &mut reads).unwrap());
    out.extend(phaser.add_site(blocker, &mut reads).unwrap());

    assert!(!phaser.is_in_block());
    assert_eq!(out.iter().map(|s| s.pos).collect::<Vec<_>>(), vec![100, 102]);
    assert_eq!(out[0].phased_ref, "AA");
    assert_eq!(
        phaser.last_outcome(),
        Some(&PhasingOutcome::Phased { start: 100, end: 101 })
    );
    assert!(out[1].filters().contains(VcfFilter::PhasingConflict));
    assert!(!out[1].smod.is_phased_region);
}
