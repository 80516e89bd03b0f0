use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rust_htslib::bam::{self, record::Cigar, Read};
use tracing::trace;

use super::{EvidenceError, ReadEvidence};
use crate::types::{AlignedRead, CigarOp, CigarOpKind};

/// Reads fetched from a coordinate-sorted, indexed BAM file.
///
/// Unmapped, secondary, supplementary, duplicate and QC-failed records are
/// skipped.
pub struct BamReadEvidence {
    reader: bam::IndexedReader,
}

impl fmt::Debug for BamReadEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BamReadEvidence").finish_non_exhaustive()
    }
}

impl BamReadEvidence {
    /// Open an indexed BAM.
    pub fn from_path(path: &Path) -> Result<Self, EvidenceError> {
        let reader =
            bam::IndexedReader::from_path(path).map_err(|source| EvidenceError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { reader })
    }
}

impl ReadEvidence for BamReadEvidence {
    fn reads_at(&mut self, chrom: &str, pos: u32) -> Result<Vec<AlignedRead>, EvidenceError> {
        if self.reader.header().tid(chrom.as_bytes()).is_none() {
            return Err(EvidenceError::UnknownChromosome(chrom.to_string()));
        }
        let start = i64::from(pos);
        self.reader.fetch((chrom, start, start + 1))?;

        let chrom: Arc<str> = Arc::from(chrom);
        let mut reads = Vec::new();
        for record in self.reader.records() {
            let record = record?;
            if record.is_unmapped()
                || record.is_secondary()
                || record.is_supplementary()
                || record.is_duplicate()
                || record.is_quality_check_failed()
            {
                continue;
            }
            let Ok(read_pos) = u32::try_from(record.pos()) else {
                continue;
            };
            let cigar: Vec<CigarOp> = record.cigar().iter().filter_map(convert_cigar).collect();
            reads.push(AlignedRead::new(
                Arc::clone(&chrom),
                read_pos,
                record.mapq(),
                cigar,
                record.seq().as_bytes(),
                record.qual().to_vec(),
                record.is_reverse(),
            ));
        }
        trace!(%chrom, pos, reads = reads.len(), "fetched spanning reads");
        Ok(reads)
    }
}

fn convert_cigar(op: &Cigar) -> Option<CigarOp> {
    let (kind, len) = match *op {
        Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => (CigarOpKind::Match, len),
        Cigar::Ins(len) => (CigarOpKind::Insertion, len),
        Cigar::Del(len) | Cigar::RefSkip(len) => (CigarOpKind::Deletion, len),
        Cigar::SoftClip(len) => (CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) => (CigarOpKind::HardClip, len),
        Cigar::Pad(_) => return None,
    };
    Some(CigarOp::new(kind, len))
}
