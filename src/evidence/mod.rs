//! Read evidence for phasing: aligned reads overlapping a reference position.

mod bam;

use std::path::PathBuf;

use thiserror::Error;

pub use self::bam::BamReadEvidence;
use crate::types::AlignedRead;

/// Failures of a read evidence provider.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// Alignment file or its index could not be opened.
    #[error("failed to open alignments {path}: {source}")]
    Open {
        /// Alignment file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: rust_htslib::errors::Error,
    },
    /// Reading records failed.
    #[error("alignment read failed: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),
    /// Chromosome is not present in the alignment header.
    #[error("chromosome '{0}' is not in the alignment header")]
    UnknownChromosome(String),
}

/// Source of aligned reads for the phasing assembler.
pub trait ReadEvidence {
    /// Reads on `chrom` whose alignment covers 0-based position `pos`.
    fn reads_at(&mut self, chrom: &str, pos: u32) -> Result<Vec<AlignedRead>, EvidenceError>;
}

impl<R: ReadEvidence + ?Sized> ReadEvidence for &mut R {
    fn reads_at(&mut self, chrom: &str, pos: u32) -> Result<Vec<AlignedRead>, EvidenceError> {
        (**self).reads_at(chrom, pos)
    }
}

/// Reads held in memory, for tests and small inputs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReads {
    reads: Vec<AlignedRead>,
}

impl InMemoryReads {
    /// Wrap a set of reads.
    pub fn new(reads: Vec<AlignedRead>) -> Self {
        Self { reads }
    }

    /// Add one read.
    pub fn push(&mut self, read: AlignedRead) {
        self.reads.push(read);
    }

    /// Number of reads held.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Whether no reads are held.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

impl ReadEvidence for InMemoryReads {
    fn reads_at(&mut self, chrom: &str, pos: u32) -> Result<Vec<AlignedRead>, EvidenceError> {
        Ok(self
            .reads
            .iter()
            .filter(|read| &*read.chrom == chrom && read.pos <= pos && pos < read.end())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_reads_filter_by_overlap() {
        let mut reads = InMemoryReads::default();
        reads.push(AlignedRead::new("chr1", 10, 60, Vec::new(), b"ACGT".to_vec(), vec![30; 4], false));
        reads.push(AlignedRead::new("chr1", 20, 60, Vec::new(), b"ACGT".to_vec(), vec![30; 4], false));
        reads.push(AlignedRead::new("chr2", 10, 60, Vec::new(), b"ACGT".to_vec(), vec![30; 4], false));

        assert_eq!(reads.reads_at("chr1", 13).unwrap().len(), 1);
        assert!(reads.reads_at("chr1", 14).unwrap().is_empty());
        assert_eq!(reads.reads_at("chr2", 10).unwrap().len(), 1);
    }
}
