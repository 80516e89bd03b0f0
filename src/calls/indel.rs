use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{
    depth_ratio, CallRecord, ContractError, FeatureMap, FilterMetrics, IndelGenotype,
    SharedModifiers,
};
use crate::types::CigarOp;

/// Identity of an indel event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct IndelKey {
    /// 0-based position of the first affected reference base.
    pub pos: u32,
    /// Reference bases removed.
    pub delete_length: u32,
    /// Bases inserted.
    pub insert_seq: String,
}

impl IndelKey {
    /// Pure insertion.
    pub fn insertion(pos: u32, insert_seq: impl Into<String>) -> Self {
        Self {
            pos,
            delete_length: 0,
            insert_seq: insert_seq.into(),
        }
    }

    /// Pure deletion.
    pub fn deletion(pos: u32, delete_length: u32) -> Self {
        Self {
            pos,
            delete_length,
            insert_seq: String::new(),
        }
    }

    /// End of the reference span (half-open).
    pub fn end(&self) -> u32 {
        self.pos + self.delete_length
    }

    /// Net insertion of sequence.
    pub fn is_insertion(&self) -> bool {
        self.insert_seq.len() > self.delete_length as usize
    }
}

/// Diploid indel genotype descriptor from the indel genotyper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiploidIndel {
    /// Index of the most likely genotype (see [`IndelGenotype`]).
    pub max_gt: usize,
    /// Phred-scaled confidence in `max_gt`.
    pub max_gt_qphred: i32,
    /// Phred-scaled confidence that any indel is present.
    pub indel_qphred: i32,
    /// Called in a haploid region.
    pub is_haploid: bool,
    /// Called in a region with no expected copies.
    pub is_noploid: bool,
}

/// Repeat context of the indel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndelReportInfo {
    /// Whether the indel changes a whole number of repeat units.
    pub is_repeat_unit: bool,
    /// Repeat unit sequence.
    pub repeat_unit: String,
    /// Repeat unit copies in the reference.
    pub ref_repeat_count: u32,
    /// Repeat unit copies in the indel allele.
    pub indel_repeat_count: u32,
}

/// Per-sample read support for the indel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndelSampleReportInfo {
    /// Q30 reads supporting the reference.
    pub n_q30_ref_reads: u32,
    /// Q30 reads supporting this indel.
    pub n_q30_indel_reads: u32,
    /// Q30 reads supporting another allele.
    pub n_q30_alt_reads: u32,
    /// Total depth at the indel.
    pub depth: u32,
}

/// Indel-specific modifiers layered over [`SharedModifiers`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndelModifiers {
    /// Filters, genotype qualities and selected genotype.
    #[serde(flatten)]
    pub shared: SharedModifiers,
    /// Indel is one half of an overlapping het-alt pair.
    pub is_overlap: bool,
    /// Site ploidy at each reference offset of the overlapping indel set.
    pub ploidy: Vec<u32>,
    /// Alignment of the indel allele against the reference.
    pub cigar: Vec<CigarOp>,
}

impl IndelModifiers {
    /// Reset for record reinitialisation.
    pub fn clear(&mut self) {
        self.shared.clear();
        self.is_overlap = false;
        self.ploidy.clear();
    }
}

/// Evidence and genotype for one indel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndelCall {
    /// Chromosome name.
    pub chrom: Arc<str>,
    /// 0-based position.
    pub pos: u32,
    /// Indel identity.
    pub key: IndelKey,
    /// Genotype descriptor.
    pub dindel: DiploidIndel,
    /// Repeat context.
    pub iri: IndelReportInfo,
    /// Sample read support.
    pub isri: IndelSampleReportInfo,
    /// Indel modifiers.
    pub imod: IndelModifiers,
    /// RMS mapping quality.
    pub mq: f64,
    /// Read position rank-sum statistic.
    pub read_pos_rank_sum: f64,
    /// Base quality rank-sum statistic.
    pub base_q_rank_sum: f64,
    /// Mapping quality rank-sum statistic.
    pub mq_rank_sum: f64,
    /// Calibrated quality score; `None` until a model has scored the indel.
    pub qscore: Option<i32>,
}

impl Default for IndelCall {
    fn default() -> Self {
        Self {
            chrom: Arc::from(""),
            pos: 0,
            key: IndelKey::default(),
            dindel: DiploidIndel::default(),
            iri: IndelReportInfo::default(),
            isri: IndelSampleReportInfo::default(),
            imod: IndelModifiers::default(),
            mq: 0.0,
            read_pos_rank_sum: 0.0,
            base_q_rank_sum: 0.0,
            mq_rank_sum: 0.0,
            qscore: None,
        }
    }
}

impl IndelCall {
    /// Create an indel call.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        key: IndelKey,
        dindel: DiploidIndel,
        iri: IndelReportInfo,
        isri: IndelSampleReportInfo,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos: key.pos,
            key,
            dindel,
            iri,
            isri,
            ..Self::default()
        }
    }

    /// Reinitialise statistics, score and modifiers.
    pub fn reinit(&mut self) {
        self.imod.clear();
        self.mq = 0.0;
        self.read_pos_rank_sum = 0.0;
        self.base_q_rank_sum = 0.0;
        self.mq_rank_sum = 0.0;
        self.qscore = None;
    }

    /// Selected genotype, validated for the call's ploidy mode.
    pub fn max_genotype(&self) -> Result<IndelGenotype, ContractError> {
        IndelGenotype::from_index(self.imod.shared.max_gt).map_err(|_| {
            ContractError::IndelGenotypeIndex {
                index: self.imod.shared.max_gt,
                haploid: self.dindel.is_haploid,
            }
        })
    }

    /// VCF `GT` text for the indel.
    pub fn genotype(&self) -> Result<&'static str, ContractError> {
        if self.imod.is_overlap {
            return Ok("1/2");
        }
        let gt = self.max_genotype()?;
        if self.dindel.is_haploid {
            gt.haploid_label()
        } else {
            Ok(gt.label())
        }
    }

    /// Whether the selected genotype is heterozygous.
    pub fn is_het(&self) -> bool {
        self.max_genotype()
            .is_ok_and(|gt| gt == IndelGenotype::Het)
    }

    /// Het-alt calls are exactly the overlapping pairs.
    pub fn is_hetalt(&self) -> bool {
        self.imod.is_overlap
    }

    /// Site ploidy within the indel at reference `offset`.
    pub fn ploidy(&self, offset: usize) -> Result<u32, ContractError> {
        if self.dindel.is_noploid {
            return Ok(0);
        }
        if self.imod.is_overlap {
            return self
                .imod
                .ploidy
                .get(offset)
                .copied()
                .ok_or(ContractError::PloidyOffset {
                    offset,
                    len: self.imod.ploidy.len(),
                });
        }
        let called = IndelGenotype::from_index(self.dindel.max_gt).map_err(|_| {
            ContractError::IndelGenotypeIndex {
                index: self.dindel.max_gt,
                haploid: self.dindel.is_haploid,
            }
        })?;
        Ok(match called {
            IndelGenotype::Hom => 0,
            IndelGenotype::Het => 1,
            IndelGenotype::NoIndel if self.dindel.is_haploid => 1,
            IndelGenotype::NoIndel => 2,
        })
    }

    /// Scoring features for the indel.
    pub fn qscore_features(&self, chrom_depth: f64) -> FeatureMap {
        let depth = f64::from(self.isri.depth);
        let mut features = FeatureMap::new();
        features.insert("GQX".into(), f64::from(self.imod.shared.gqx));
        features.insert("GQ".into(), f64::from(self.imod.shared.gq));
        features.insert("REFREP1".into(), f64::from(self.iri.ref_repeat_count));
        features.insert("IDREP1".into(), f64::from(self.iri.indel_repeat_count));
        features.insert("RULEN1".into(), self.iri.repeat_unit.len() as f64);
        features.insert("AD0".into(), f64::from(self.isri.n_q30_ref_reads));
        features.insert("AD1".into(), f64::from(self.isri.n_q30_indel_reads));
        features.insert("AD2".into(), f64::from(self.isri.n_q30_alt_reads));
        features.insert("F_DPI".into(), depth);
        features.insert("MQ".into(), self.mq);
        features.insert("ReadPosRankSum".into(), self.read_pos_rank_sum);
        features.insert("BaseQRankSum".into(), self.base_q_rank_sum);
        features.insert("MQRankSum".into(), self.mq_rank_sum);
        features.insert("DP_NORM".into(), depth_ratio(depth, chrom_depth));
        features
    }
}

impl CallRecord for IndelCall {
    fn shared(&self) -> &SharedModifiers {
        &self.imod.shared
    }

    fn shared_mut(&mut self) -> &mut SharedModifiers {
        &mut self.imod.shared
    }

    fn qscore(&self) -> Option<i32> {
        self.qscore
    }

    fn set_qscore(&mut self, qscore: i32) {
        self.qscore = Some(qscore);
    }

    fn filter_metrics(&self) -> FilterMetrics {
        FilterMetrics {
            depth: self.isri.depth,
            unused_basecalls: None,
            snv: None,
            ref_repeat: self
                .iri
                .is_repeat_unit
                .then(|| (self.iri.repeat_unit.len(), self.iri.ref_repeat_count)),
        }
    }

    fn qscore_features(&self, chrom_depth: f64) -> FeatureMap {
        IndelCall::qscore_features(self, chrom_depth)
    }
}
