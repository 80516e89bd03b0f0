//! Per-position call records handed between the scoring and phasing stages.
//!
//! A record is created by the upstream genotyper, mutated in place by the
//! model registry (quality score, filters) and, for sites, by the phasing
//! block assembler, and finally handed to the emitter.

mod filters;
mod genotype;
mod indel;
mod site;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filters::{FilterSet, VcfFilter};
pub use genotype::{base_index, Digt, IndelGenotype, BASES, N_BASE};
pub use indel::{
    DiploidIndel, IndelCall, IndelKey, IndelModifiers, IndelReportInfo, IndelSampleReportInfo,
};
pub use site::{DiploidGenotype, ModifiedGenotype, SiteCall, SiteModifiers};

/// Named numeric features extracted from a call, ordered by name.
pub type FeatureMap = BTreeMap<String, f64>;

/// Violations of the record invariants the upstream producer guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Site genotype index outside the diploid enumeration.
    #[error("site genotype index {index} is outside the diploid genotype enumeration")]
    SiteGenotypeIndex {
        /// Offending index.
        index: usize,
    },
    /// Indel genotype index outside the enumeration for the ploidy mode.
    #[error("indel genotype index {index} is invalid for a {} call", ploidy_mode(.haploid))]
    IndelGenotypeIndex {
        /// Offending index.
        index: usize,
        /// Whether the call was made in haploid mode.
        haploid: bool,
    },
    /// Ploidy queried past the end of an overlapping indel's ploidy vector.
    #[error("ploidy offset {offset} is outside the overlap span of length {len}")]
    PloidyOffset {
        /// Requested offset.
        offset: usize,
        /// Ploidy vector length.
        len: usize,
    },
}

fn ploidy_mode(haploid: &bool) -> &'static str {
    if *haploid {
        "haploid"
    } else {
        "diploid"
    }
}

/// Modifiers common to site and indel calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedModifiers {
    /// Accumulated filters.
    pub filters: FilterSet,
    /// Genotype quality.
    pub gq: i32,
    /// Genotype quality, also bounded by the variant quality.
    pub gqx: i32,
    /// Index of the selected genotype in the call's genotype enumeration.
    pub max_gt: usize,
}

impl SharedModifiers {
    /// Apply one filter.
    pub fn set_filter(&mut self, filter: VcfFilter) {
        self.filters.set(filter);
    }

    /// Reset filters for record reinitialisation.
    pub fn clear(&mut self) {
        self.filters.clear();
    }
}

/// Evidence the hard filters read from a record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterMetrics {
    /// Total depth at the call.
    pub depth: u32,
    /// Basecalls filtered out upstream, when the record tracks them.
    pub unused_basecalls: Option<u32>,
    /// SNV strand bias and homopolymer length, for SNV sites.
    pub snv: Option<(f64, u32)>,
    /// Repeat unit length and reference repeat count, for repeat-context indels.
    pub ref_repeat: Option<(usize, u32)>,
}

/// Common view over site and indel records used by scoring and filtering.
pub trait CallRecord {
    /// Shared modifiers.
    fn shared(&self) -> &SharedModifiers;

    /// Mutable shared modifiers.
    fn shared_mut(&mut self) -> &mut SharedModifiers;

    /// Calibrated quality score, `None` until scored.
    fn qscore(&self) -> Option<i32>;

    /// Record a calibrated quality score.
    fn set_qscore(&mut self, qscore: i32);

    /// Values consulted by the hard filters.
    fn filter_metrics(&self) -> FilterMetrics;

    /// Scoring features, with depth-dependent values normalised by `chrom_depth`.
    fn qscore_features(&self, chrom_depth: f64) -> FeatureMap;

    /// Apply one filter.
    fn set_filter(&mut self, filter: VcfFilter) {
        self.shared_mut().set_filter(filter);
    }

    /// Current filter set.
    fn filters(&self) -> &FilterSet {
        &self.shared().filters
    }
}

/// Serde adapter writing a single base byte as a one-character string.
pub(crate) mod base_char {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(base: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(char::from(*base))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let symbol = char::deserialize(deserializer)?;
        if symbol.is_ascii() {
            Ok(symbol.to_ascii_uppercase() as u8)
        } else {
            Err(D::Error::custom(format!("base '{symbol}' is not ASCII")))
        }
    }
}

/// Depth divided by chromosome depth, zero when the denominator is unusable.
pub(crate) fn depth_ratio(depth: f64, chrom_depth: f64) -> f64 {
    if chrom_depth > 0.0 {
        depth / chrom_depth
    } else {
        0.0
    }
}
