use tracing::debug;

use crate::calls::{IndelCall, VcfFilter};

/// What the overlap pass decided for a group of indels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapOutcome {
    /// Fewer than two indels.
    Single,
    /// No two indels share reference span.
    Disjoint,
    /// Two overlapping heterozygous indels merged into a het-alt pair.
    HetAltPair,
    /// Overlapping indels that cannot form a diploid pair.
    Conflict,
}

/// Reference span an indel occupies; insertions occupy their anchor base.
pub(super) fn span(indel: &IndelCall) -> (u32, u32) {
    let start = indel.key.pos;
    (start, indel.key.end().max(start + 1))
}

fn overlaps(a: &IndelCall, b: &IndelCall) -> bool {
    let (a_start, a_end) = span(a);
    let (b_start, b_end) = span(b);
    a_start < b_end && b_start < a_end
}

/// Resolve a group of indels sharing genomic span.
///
/// Exactly two overlapping heterozygous indels become a het-alt pair: both
/// get `is_overlap`, a ploidy vector over the joint span giving `2 - k` where
/// `k` deletions remove the base, and the smaller of their qualities. Any other
/// overlapping group is marked with [`VcfFilter::IndelConflict`].
/// Modifiers must already be derived from the genotyper output.
pub fn resolve_overlap(indels: &mut [IndelCall]) -> OverlapOutcome {
    if indels.len() < 2 {
        return OverlapOutcome::Single;
    }

    let any_overlap = indels
        .iter()
        .enumerate()
        .any(|(i, a)| indels[i + 1..].iter().any(|b| overlaps(a, b)));
    if !any_overlap {
        return OverlapOutcome::Disjoint;
    }

    if let [first, second] = &mut *indels {
        if first.is_het() && second.is_het() {
            pair_het_alt(first, second);
            debug!(
                chrom = %first.chrom,
                pos = first.pos,
                ploidy = ?first.imod.ploidy,
                "overlapping het indels merged into het-alt pair"
            );
            return OverlapOutcome::HetAltPair;
        }
    }

    for indel in indels.iter_mut() {
        indel.imod.shared.set_filter(VcfFilter::IndelConflict);
    }
    debug!(
        chrom = %indels[0].chrom,
        pos = indels[0].pos,
        count = indels.len(),
        "conflicting overlapping indels"
    );
    OverlapOutcome::Conflict
}

fn pair_het_alt(first: &mut IndelCall, second: &mut IndelCall) {
    let (first_start, first_end) = span(first);
    let (second_start, second_end) = span(second);
    let start = first_start.min(second_start);
    let end = first_end.max(second_end);

    let ploidy: Vec<u32> = (start..end)
        .map(|pos| {
            let removed = [&*first, &*second]
                .iter()
                .filter(|indel| indel.key.pos <= pos && pos < indel.key.end())
                .count() as u32;
            2u32.saturating_sub(removed)
        })
        .collect();

    let gq = first.imod.shared.gq.min(second.imod.shared.gq);
    let gqx = first.imod.shared.gqx.min(second.imod.shared.gqx);

    for indel in [first, second] {
        let offset = (indel.key.pos - start) as usize;
        indel.imod.is_overlap = true;
        indel.imod.ploidy = ploidy[offset..].to_vec();
        indel.imod.shared.gq = gq;
        indel.imod.shared.gqx = gqx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{CallRecord, IndelGenotype, IndelKey};

    fn het_deletion(pos: u32, len: u32, gqx: i32) -> IndelCall {
        let mut indel = IndelCall::default();
        indel.chrom = "chr1".into();
        indel.pos = pos;
        indel.key = IndelKey::deletion(pos, len);
        indel.imod.shared.max_gt = IndelGenotype::Het.index();
        indel.imod.shared.gq = gqx + 5;
        indel.imod.shared.gqx = gqx;
        indel
    }

    #[test]
    fn overlapping_het_deletions_form_pair() {
        let mut group = [het_deletion(100, 3, 40), het_deletion(101, 4, 25)];
        assert_eq!(resolve_overlap(&mut group), OverlapOutcome::HetAltPair);

        // span 100..105: 100 → one deletion, 101..103 → both, 103..105 → one
        assert_eq!(group[0].imod.ploidy, vec![1, 0, 0, 1, 1]);
        assert_eq!(group[1].imod.ploidy, vec![0, 0, 1, 1]);
        assert!(group.iter().all(|indel| indel.imod.is_overlap));
        assert!(group.iter().all(|indel| indel.imod.shared.gqx == 25));
        assert_eq!(group[0].genotype().unwrap(), "1/2");
        assert_eq!(group[1].ploidy(0).unwrap(), 0);
        assert!(group[0].filters().is_empty());
    }

    #[test]
    fn disjoint_indels_are_untouched() {
        let mut group = [het_deletion(100, 2, 40), het_deletion(102, 2, 40)];
        assert_eq!(resolve_overlap(&mut group), OverlapOutcome::Disjoint);
        assert!(group.iter().all(|indel| !indel.imod.is_overlap));
    }

    #[test]
    fn hom_overlap_or_triples_conflict() {
        let mut hom = het_deletion(100, 3, 40);
        hom.imod.shared.max_gt = IndelGenotype::Hom.index();
        let mut group = [hom, het_deletion(101, 2, 40)];
        assert_eq!(resolve_overlap(&mut group), OverlapOutcome::Conflict);
        assert!(group
            .iter()
            .all(|indel| indel.filters().contains(VcfFilter::IndelConflict)));

        let mut triple = [
            het_deletion(100, 3, 40),
            het_deletion(101, 3, 40),
            het_deletion(102, 3, 40),
        ];
        assert_eq!(resolve_overlap(&mut triple), OverlapOutcome::Conflict);
    }
}
