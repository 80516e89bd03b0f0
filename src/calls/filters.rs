use std::fmt;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Named VCF filters a call can accumulate.
///
/// The order and labels are a stable contract with the record emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VcfFilter {
    /// Overlapping indels could not be reconciled into one diploid call.
    IndelConflict,
    /// Site genotype conflicts with an overlapping indel.
    SiteConflict,
    /// Heterozygous call in a haploid region.
    PloidyConflict,
    /// Legacy genotype-quality cutoff.
    LowGqx,
    /// Quality below the het SNP cutoff.
    LowQscoreHetSnp,
    /// Quality below the hom SNP cutoff.
    LowQscoreHomSnp,
    /// Quality below the het-alt SNP cutoff.
    LowQscoreHetAltSnp,
    /// Quality below the het insertion cutoff.
    LowQscoreHetIns,
    /// Quality below the hom insertion cutoff.
    LowQscoreHomIns,
    /// Quality below the het-alt insertion cutoff.
    LowQscoreHetAltIns,
    /// Quality below the het deletion cutoff.
    LowQscoreHetDel,
    /// Quality below the hom deletion cutoff.
    LowQscoreHomDel,
    /// Quality below the het-alt deletion cutoff.
    LowQscoreHetAltDel,
    /// Phased region built over a site that must not be phased.
    PhasingConflict,
    /// Too many basecalls were filtered at this site.
    HighBaseFilt,
    /// Depth far above the chromosome average.
    HighDepth,
    /// SNV strand bias.
    HighSnvSb,
    /// SNV inside a long homopolymer.
    HighSnvHpol,
    /// Indel inside a long reference repeat.
    HighRefRep,
}

impl VcfFilter {
    /// Number of distinct filters.
    pub const COUNT: usize = 19;

    /// All filters in contract order.
    pub const ALL: [VcfFilter; VcfFilter::COUNT] = [
        VcfFilter::IndelConflict,
        VcfFilter::SiteConflict,
        VcfFilter::PloidyConflict,
        VcfFilter::LowGqx,
        VcfFilter::LowQscoreHetSnp,
        VcfFilter::LowQscoreHomSnp,
        VcfFilter::LowQscoreHetAltSnp,
        VcfFilter::LowQscoreHetIns,
        VcfFilter::LowQscoreHomIns,
        VcfFilter::LowQscoreHetAltIns,
        VcfFilter::LowQscoreHetDel,
        VcfFilter::LowQscoreHomDel,
        VcfFilter::LowQscoreHetAltDel,
        VcfFilter::PhasingConflict,
        VcfFilter::HighBaseFilt,
        VcfFilter::HighDepth,
        VcfFilter::HighSnvSb,
        VcfFilter::HighSnvHpol,
        VcfFilter::HighRefRep,
    ];

    /// Label rendered in the VCF FILTER column.
    pub fn label(self) -> &'static str {
        match self {
            VcfFilter::IndelConflict => "IndelConflict",
            VcfFilter::SiteConflict => "SiteConflict",
            VcfFilter::PloidyConflict => "PLOIDY_CONFLICT",
            VcfFilter::LowGqx => "LowGQX",
            VcfFilter::LowQscoreHetSnp => "LowGQXHetSNP",
            VcfFilter::LowQscoreHomSnp => "LowGQXHomSNP",
            VcfFilter::LowQscoreHetAltSnp => "LowGQXHetAltSNP",
            VcfFilter::LowQscoreHetIns => "LowGQXHetIns",
            VcfFilter::LowQscoreHomIns => "LowGQXHomIns",
            VcfFilter::LowQscoreHetAltIns => "LowGQXHetAltIns",
            VcfFilter::LowQscoreHetDel => "LowGQXHetDel",
            VcfFilter::LowQscoreHomDel => "LowGQXHomDel",
            VcfFilter::LowQscoreHetAltDel => "LowGQXHetAltDel",
            VcfFilter::PhasingConflict => "PhasingConflict",
            VcfFilter::HighBaseFilt => "HighDPFRatio",
            VcfFilter::HighDepth => "HighDepth",
            VcfFilter::HighSnvSb => "HighSNVSB",
            VcfFilter::HighSnvHpol => "HighSNVHPOL",
            VcfFilter::HighRefRep => "HighREFREP",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for VcfFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type FilterBits = BitArr!(for VcfFilter::COUNT, in u32, Lsb0);

/// Fixed-size set of filters attached to one call.
///
/// Filters only accumulate; `clear` is reserved for record reinitialisation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<VcfFilter>", into = "Vec<VcfFilter>")]
pub struct FilterSet {
    bits: FilterBits,
}

impl FilterSet {
    /// Empty filter set.
    pub fn new() -> Self {
        Self {
            bits: FilterBits::ZERO,
        }
    }

    /// Add a filter.
    pub fn set(&mut self, filter: VcfFilter) {
        self.bits.set(filter.index(), true);
    }

    /// Whether the filter has been applied.
    pub fn contains(&self, filter: VcfFilter) -> bool {
        self.bits[filter.index()]
    }

    /// True when no filter is set (the call passes).
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Number of filters set.
    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    /// Union another set into this one.
    pub fn extend_from(&mut self, other: &FilterSet) {
        for idx in other.bits.iter_ones() {
            self.bits.set(idx, true);
        }
    }

    /// Remove every filter.
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// Iterate set filters in contract order.
    pub fn iter(&self) -> impl Iterator<Item = VcfFilter> + '_ {
        self.bits
            .iter_ones()
            .filter_map(|idx| VcfFilter::ALL.get(idx).copied())
    }

    /// FILTER column text: `PASS` or `;`-joined labels.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "PASS".to_string();
        }
        self.iter()
            .map(VcfFilter::label)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<Vec<VcfFilter>> for FilterSet {
    fn from(filters: Vec<VcfFilter>) -> Self {
        let mut set = FilterSet::new();
        for filter in filters {
            set.set(filter);
        }
        set
    }
}

impl From<FilterSet> for Vec<VcfFilter> {
    fn from(set: FilterSet) -> Self {
        set.iter().collect()
    }
}
