//! Aligned reads as seen by the phasing assembler.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Alignment operation kinds, with `=`/`X` folded into `Match` and `N` into
/// `Deletion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CigarOpKind {
    /// Aligned bases, matching or not.
    Match,
    /// Read bases absent from the reference.
    Insertion,
    /// Reference bases absent from the read.
    Deletion,
    /// Clipped bases still stored in the read sequence.
    SoftClip,
    /// Clipped bases removed from the read sequence.
    HardClip,
}

/// One run-length CIGAR element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CigarOp {
    /// What the run does.
    pub kind: CigarOpKind,
    /// Run length.
    pub len: u32,
}

impl CigarOp {
    /// Build a run.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// A primary alignment overlapping a phasing block.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Chromosome the read aligns to.
    pub chrom: Arc<str>,
    /// 0-based reference position of the first aligned base.
    pub pos: u32,
    /// Phred mapping quality.
    pub mapq: u8,
    /// Alignment path. Empty means one ungapped match over the whole read.
    pub cigar: Vec<CigarOp>,
    /// Bases as ASCII, in reference orientation.
    pub sequence: Arc<[u8]>,
    /// Phred base qualities, one per base.
    pub qualities: Arc<[u8]>,
    /// Aligned to the reverse strand.
    pub is_reverse: bool,
}

impl AlignedRead {
    /// Assemble a read from its alignment fields.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        pos: u32,
        mapq: u8,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
        is_reverse: bool,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            mapq,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            is_reverse,
        }
    }

    /// Number of stored bases.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read has no stored bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Half-open reference end of the alignment.
    pub fn end(&self) -> u32 {
        if self.cigar.is_empty() {
            return self.pos + self.len() as u32;
        }
        let ref_len: u32 = self
            .cigar
            .iter()
            .filter(|op| matches!(op.kind, CigarOpKind::Match | CigarOpKind::Deletion))
            .map(|op| op.len)
            .sum();
        self.pos + ref_len
    }

    /// Read offsets covering the inclusive reference interval `[start, end]`.
    ///
    /// Returns `None` unless the whole interval falls inside a single aligned
    /// match segment, so the extracted bases are gap-free on both sequences.
    pub fn span_offsets(&self, start: u32, end: u32) -> Option<Range<usize>> {
        if end < start {
            return None;
        }
        if self.cigar.is_empty() {
            let match_op = [CigarOp::new(CigarOpKind::Match, self.len() as u32)];
            return span_in_ops(self.pos, &match_op, start, end);
        }
        span_in_ops(self.pos, &self.cigar, start, end)
    }
}

fn span_in_ops(pos: u32, ops: &[CigarOp], start: u32, end: u32) -> Option<Range<usize>> {
    let mut ref_cursor = pos;
    let mut read_cursor = 0usize;
    for op in ops {
        match op.kind {
            CigarOpKind::Match => {
                let seg_end = ref_cursor + op.len;
                if start >= ref_cursor && end < seg_end {
                    let first = read_cursor + (start - ref_cursor) as usize;
                    let last = read_cursor + (end - ref_cursor) as usize;
                    return Some(first..last + 1);
                }
                ref_cursor = seg_end;
                read_cursor += op.len as usize;
            }
            CigarOpKind::Insertion | CigarOpKind::SoftClip => read_cursor += op.len as usize,
            CigarOpKind::Deletion => ref_cursor += op.len,
            CigarOpKind::HardClip => {}
        }
        if ref_cursor > end {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(cigar: Vec<CigarOp>, seq: &[u8]) -> AlignedRead {
        AlignedRead::new("chr1", 100, 60, cigar, seq.to_vec(), vec![30; seq.len()], false)
    }

    #[test]
    fn ungapped_read_spans_interior_window() {
        let r = read(Vec::new(), b"ACGTACGTAC");
        assert_eq!(r.span_offsets(102, 104), Some(2..5));
        assert_eq!(r.span_offsets(108, 110), None);
        assert_eq!(r.end(), 110);
    }

    #[test]
    fn soft_clip_shifts_read_offsets() {
        let r = read(
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 3),
                CigarOp::new(CigarOpKind::Match, 7),
            ],
            b"NNNACGTACG",
        );
        assert_eq!(r.span_offsets(100, 101), Some(3..5));
        assert_eq!(r.end(), 107);
    }

    #[test]
    fn window_across_deletion_is_rejected() {
        let r = read(
            vec![
                CigarOp::new(CigarOpKind::Match, 4),
                CigarOp::new(CigarOpKind::Deletion, 2),
                CigarOp::new(CigarOpKind::Match, 4),
            ],
            b"ACGTACGT",
        );
        assert_eq!(r.span_offsets(102, 103), Some(2..4));
        assert_eq!(r.span_offsets(103, 106), None);
        assert_eq!(r.span_offsets(106, 107), Some(4..6));
    }
}
