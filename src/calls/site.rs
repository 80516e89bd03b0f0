use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    base_index, depth_ratio, CallRecord, ContractError, Digt, FeatureMap, FilterMetrics,
    SharedModifiers, N_BASE,
};

/// Genotype override applied by downstream stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifiedGenotype {
    /// Use the called genotype.
    #[default]
    None,
    /// Render as unknown (`.`).
    Unknown,
    /// Haploid reference (`0`).
    Zero,
    /// Haploid alternate (`1`).
    One,
}

impl ModifiedGenotype {
    fn label(self) -> Option<&'static str> {
        match self {
            ModifiedGenotype::None => None,
            ModifiedGenotype::Unknown => Some("."),
            ModifiedGenotype::Zero => Some("0"),
            ModifiedGenotype::One => Some("1"),
        }
    }
}

/// Site-specific modifiers layered over [`SharedModifiers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteModifiers {
    /// Filters, genotype qualities and selected genotype.
    #[serde(flatten)]
    pub shared: SharedModifiers,
    /// No usable genotype was called.
    pub is_unknown: bool,
    /// Any basecall covers the site.
    pub is_covered: bool,
    /// A basecall that passed upstream filtering covers the site.
    pub is_used_covered: bool,
    /// An overlapping indel removes every allele at the site.
    pub is_zero_ploidy: bool,
    /// Site is part of a compressed reference block.
    pub is_block: bool,
    /// Site is the representative of a phased multi-base record.
    pub is_phased_region: bool,
    /// Genotype override.
    pub modified_gt: ModifiedGenotype,
}

impl SiteModifiers {
    /// Reset to the state of a freshly initialised site.
    pub fn clear(&mut self) {
        self.shared.clear();
        self.is_unknown = true;
        self.is_covered = false;
        self.is_used_covered = false;
        self.is_zero_ploidy = false;
        self.is_block = false;
        self.is_phased_region = false;
        self.modified_gt = ModifiedGenotype::None;
    }

    /// Whether the site carries a meaningful GQX value.
    pub fn is_gqx(&self) -> bool {
        !self.is_unknown && self.is_used_covered && !self.is_zero_ploidy
    }
}

impl Default for SiteModifiers {
    fn default() -> Self {
        Self {
            shared: SharedModifiers::default(),
            is_unknown: true,
            is_covered: false,
            is_used_covered: false,
            is_zero_ploidy: false,
            is_block: false,
            is_phased_region: false,
            modified_gt: ModifiedGenotype::None,
        }
    }
}

/// Diploid genotype descriptor produced by the site genotyper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiploidGenotype {
    /// Homozygous-reference genotype at the site.
    pub ref_gt: Digt,
    /// Whether the site was called as an SNV.
    pub is_snp: bool,
    /// SNV strand bias.
    pub sb: f64,
}

impl Default for DiploidGenotype {
    fn default() -> Self {
        Self {
            ref_gt: Digt::AA,
            is_snp: false,
            sb: 0.0,
        }
    }
}

/// Evidence and genotype for one single-base position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteCall {
    /// Chromosome name.
    pub chrom: Arc<str>,
    /// 0-based position.
    pub pos: u32,
    /// Reference base.
    #[serde(with = "super::base_char")]
    pub reference: u8,
    /// Filtered basecall counts per base.
    pub known_counts: [u32; N_BASE],
    /// Genotype descriptor.
    pub dgt: DiploidGenotype,
    /// Basecalls used by the genotyper.
    pub n_used_calls: u32,
    /// Basecalls filtered out upstream.
    pub n_unused_calls: u32,
    /// Homopolymer length around the site.
    pub hpol: u32,
    /// Haplotype score.
    pub hapscore: f64,
    /// RMS mapping quality.
    pub mq: f64,
    /// Read position rank-sum statistic.
    pub read_pos_rank_sum: f64,
    /// Base quality rank-sum statistic.
    pub base_q_rank_sum: f64,
    /// Mapping quality rank-sum statistic.
    pub mq_rank_sum: f64,
    /// Mean base quality.
    pub avg_base_q: f64,
    /// Mean read position of the alternate allele.
    pub raw_pos: f64,
    /// Spanning reads failing the mapping-quality test.
    pub mapq_zero: u32,
    /// Calibrated quality score; `None` until a model has scored the site.
    pub qscore: Option<i32>,
    /// The site must never be folded into a phased block.
    pub unphasable: bool,
    /// Reference allele of the phased record, empty unless phased.
    pub phased_ref: String,
    /// Alternate alleles of the phased record, empty unless phased.
    pub phased_alt: String,
    /// Allele depths of the phased record, empty unless phased.
    pub phased_ad: String,
    /// Site modifiers.
    pub smod: SiteModifiers,
}

impl Default for SiteCall {
    fn default() -> Self {
        Self {
            chrom: Arc::from(""),
            pos: 0,
            reference: b'N',
            known_counts: [0; N_BASE],
            dgt: DiploidGenotype::default(),
            n_used_calls: 0,
            n_unused_calls: 0,
            hpol: 0,
            hapscore: 0.0,
            mq: 0.0,
            read_pos_rank_sum: 0.0,
            base_q_rank_sum: 0.0,
            mq_rank_sum: 0.0,
            avg_base_q: 0.0,
            raw_pos: 0.0,
            mapq_zero: 0,
            qscore: None,
            unphasable: false,
            phased_ref: String::new(),
            phased_alt: String::new(),
            phased_ad: String::new(),
            smod: SiteModifiers::default(),
        }
    }
}

impl SiteCall {
    /// Create a site with the given coordinates and basecall counts.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        pos: u32,
        reference: u8,
        known_counts: [u32; N_BASE],
    ) -> Self {
        let reference = reference.to_ascii_uppercase();
        Self {
            chrom: chrom.into(),
            pos,
            reference,
            known_counts,
            dgt: DiploidGenotype {
                ref_gt: Digt::homozygous(reference).unwrap_or(Digt::AA),
                ..DiploidGenotype::default()
            },
            ..Self::default()
        }
    }

    /// Reinitialise the record for a new position, clearing phasing output,
    /// score and modifiers.
    pub fn reinit(&mut self, pos: u32, reference: u8, known_counts: [u32; N_BASE]) {
        self.pos = pos;
        self.reference = reference.to_ascii_uppercase();
        self.known_counts = known_counts;
        self.dgt.ref_gt = Digt::homozygous(self.reference).unwrap_or(Digt::AA);
        self.phased_ref.clear();
        self.phased_alt.clear();
        self.phased_ad.clear();
        self.qscore = None;
        self.unphasable = false;
        self.smod.clear();
    }

    /// Selected genotype, validated against the diploid enumeration.
    pub fn max_genotype(&self) -> Result<Digt, ContractError> {
        Digt::from_index(self.smod.shared.max_gt)
    }

    /// VCF `GT` text for the site.
    pub fn genotype(&self) -> Result<&'static str, ContractError> {
        if let Some(label) = self.smod.modified_gt.label() {
            return Ok(label);
        }
        if self.smod.is_unknown || !self.smod.is_used_covered {
            return Ok(".");
        }
        let shown = if self.smod.is_block {
            self.dgt.ref_gt
        } else {
            self.max_genotype()?
        };
        Ok(shown.vcf_label(self.dgt.ref_gt))
    }

    /// Whether the selected genotype is heterozygous.
    pub fn is_het(&self) -> bool {
        self.max_genotype().is_ok_and(Digt::is_het)
    }

    /// Heterozygous with neither allele matching the reference base.
    pub fn is_hetalt(&self) -> bool {
        self.max_genotype()
            .is_ok_and(|gt| gt.is_het() && !gt.contains(self.reference))
    }

    /// Whether the selected genotype differs from the reference genotype.
    pub fn is_nonref(&self) -> bool {
        self.smod.shared.max_gt != self.dgt.ref_gt.index()
    }

    /// Whether the site is a scorable variant call.
    pub fn is_qual(&self) -> bool {
        !self.smod.is_block
            && !self.smod.is_unknown
            && self.smod.is_used_covered
            && !self.smod.is_zero_ploidy
            && self.is_nonref()
    }

    /// Count of reference-supporting basecalls.
    pub fn ref_count(&self) -> u32 {
        base_index(self.reference).map_or(0, |idx| self.known_counts[idx])
    }

    /// Largest non-reference basecall count.
    pub fn top_alt_count(&self) -> u32 {
        let ref_idx = base_index(self.reference);
        self.known_counts
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != ref_idx)
            .map(|(_, &count)| count)
            .max()
            .unwrap_or(0)
    }

    /// Total basecalls at the site.
    pub fn total_calls(&self) -> u32 {
        self.n_used_calls + self.n_unused_calls
    }

    /// Scoring features for the site.
    pub fn qscore_features(&self, chrom_depth: f64) -> FeatureMap {
        let depth = f64::from(self.n_used_calls);
        let mut features = FeatureMap::new();
        features.insert("GQX".into(), f64::from(self.smod.shared.gqx));
        features.insert("GQ".into(), f64::from(self.smod.shared.gq));
        features.insert("SNVSB".into(), self.dgt.sb);
        features.insert("SNVHPOL".into(), f64::from(self.hpol));
        features.insert("F_DP".into(), depth);
        features.insert("F_DPF".into(), f64::from(self.n_unused_calls));
        features.insert("AD0".into(), f64::from(self.ref_count()));
        features.insert("AD1".into(), f64::from(self.top_alt_count()));
        features.insert("MQ".into(), self.mq);
        features.insert("ReadPosRankSum".into(), self.read_pos_rank_sum);
        features.insert("BaseQRankSum".into(), self.base_q_rank_sum);
        features.insert("MQRankSum".into(), self.mq_rank_sum);
        features.insert("AvgBaseQ".into(), self.avg_base_q);
        features.insert("AvgPos".into(), self.raw_pos);
        features.insert("HaplotypeScore".into(), self.hapscore);
        features.insert("DP_NORM".into(), depth_ratio(depth, chrom_depth));
        features
    }
}

impl CallRecord for SiteCall {
    fn shared(&self) -> &SharedModifiers {
        &self.smod.shared
    }

    fn shared_mut(&mut self) -> &mut SharedModifiers {
        &mut self.smod.shared
    }

    fn qscore(&self) -> Option<i32> {
        self.qscore
    }

    fn set_qscore(&mut self, qscore: i32) {
        self.qscore = Some(qscore);
    }

    fn filter_metrics(&self) -> FilterMetrics {
        FilterMetrics {
            depth: self.total_calls(),
            unused_basecalls: Some(self.n_unused_calls),
            snv: self.dgt.is_snp.then_some((self.dgt.sb, self.hpol)),
            ref_repeat: None,
        }
    }

    fn qscore_features(&self, chrom_depth: f64) -> FeatureMap {
        SiteCall::qscore_features(self, chrom_depth)
    }
}
