use std::mem;
use std::sync::Arc;

use tracing::{debug, info};

use super::AlleleObservations;
use crate::calls::{base_index, CallRecord, Digt, SiteCall, VcfFilter};
use crate::config::PhasingOptions;
use crate::evidence::{EvidenceError, ReadEvidence};

/// Result of the most recent block closure.
#[derive(Debug, Clone, PartialEq)]
pub enum PhasingOutcome {
    /// A phased record was emitted for `[start, end]`.
    Phased {
        /// First block position.
        start: u32,
        /// Last block position.
        end: u32,
    },
    /// The block held at most one het call.
    TooFewHets {
        /// Het calls in the block.
        het_count: u32,
    },
    /// Some position inside the block had no site record.
    NonContiguous,
    /// Not enough usable spanning reads.
    InsufficientReads {
        /// Usable reads found.
        usable: u32,
    },
    /// The reads show fewer than two alleles, or the top two carry too
    /// small a fraction of them.
    NotDiploid {
        /// Fraction of usable reads carried by the top two alleles.
        max_allele_frac: f64,
    },
    /// The second allele is too rare relative to the first.
    AlleleImbalance {
        /// Second allele count over first allele count.
        relative_allele_frac: f64,
    },
}

impl PhasingOutcome {
    /// Whether a phased record was produced.
    pub fn is_phased(&self) -> bool {
        matches!(self, PhasingOutcome::Phased { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Idle,
    InBlock { start: u32, end: u32, het_count: u32 },
}

/// Streaming assembler merging runs of het site calls into phased records.
///
/// Calls go in through [`add_site`](Self::add_site) in position order; each
/// call returns the records that are ready to emit. Every input record is
/// eventually returned unless a successful phase subsumed it into the
/// block's representative.
#[derive(Debug)]
pub struct BlockPhaser {
    options: PhasingOptions,
    state: BlockState,
    buffer: Vec<SiteCall>,
    chrom: Option<Arc<str>>,
    observations: AlleleObservations,
    last_outcome: Option<PhasingOutcome>,
}

impl Default for BlockPhaser {
    fn default() -> Self {
        Self::new(PhasingOptions::default())
    }
}

impl BlockPhaser {
    /// Assembler with the given options.
    pub fn new(options: PhasingOptions) -> Self {
        Self {
            options,
            state: BlockState::Idle,
            buffer: Vec::new(),
            chrom: None,
            observations: AlleleObservations::new(),
            last_outcome: None,
        }
    }

    /// Options in use.
    pub fn options(&self) -> &PhasingOptions {
        &self.options
    }

    /// Whether a block is open.
    pub fn is_in_block(&self) -> bool {
        matches!(self.state, BlockState::InBlock { .. })
    }

    /// First and last het positions of the open block.
    pub fn block_span(&self) -> Option<(u32, u32)> {
        match self.state {
            BlockState::Idle => None,
            BlockState::InBlock { start, end, .. } => Some((start, end)),
        }
    }

    /// Records held back while the block is open.
    pub fn buffered(&self) -> &[SiteCall] {
        &self.buffer
    }

    /// Outcome of the last closed block.
    pub fn last_outcome(&self) -> Option<&PhasingOutcome> {
        self.last_outcome.as_ref()
    }

    /// Read counts gathered for the last phasing attempt.
    pub fn observations(&self) -> &AlleleObservations {
        &self.observations
    }

    /// Feed the next site call; returns the records ready for emission.
    pub fn add_site<R: ReadEvidence + ?Sized>(
        &mut self,
        site: SiteCall,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, EvidenceError> {
        let mut ready = Vec::new();
        if self.chrom.as_ref().is_some_and(|chrom| *chrom != site.chrom) {
            ready = self.finish(evidence)?;
        }

        if site.unphasable {
            ready.extend(self.pass_unphasable(site, evidence)?);
            return Ok(ready);
        }

        let het = site.is_het();
        let pos = site.pos;
        match self.state {
            BlockState::Idle if het => {
                self.state = BlockState::InBlock {
                    start: pos,
                    end: pos,
                    het_count: 1,
                };
                self.chrom = Some(Arc::clone(&site.chrom));
                self.buffer.push(site);
            }
            BlockState::Idle => ready.push(site),
            BlockState::InBlock {
                start, het_count, ..
            } if het => {
                self.state = BlockState::InBlock {
                    start,
                    end: pos,
                    het_count: het_count + 1,
                };
                self.buffer.push(site);
            }
            BlockState::InBlock { end, .. } if pos.saturating_sub(end) + 1 < self.options.window => {
                self.buffer.push(site);
            }
            BlockState::InBlock { .. } => {
                self.buffer.push(site);
                ready.extend(self.close_block(evidence)?);
            }
        }
        Ok(ready)
    }

    /// An unphasable call bounds the open block. It is flagged
    /// `PhasingConflict` when it would otherwise have joined the block.
    fn pass_unphasable<R: ReadEvidence + ?Sized>(
        &mut self,
        mut site: SiteCall,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, EvidenceError> {
        let BlockState::InBlock { end, .. } = self.state else {
            return Ok(vec![site]);
        };
        if site.is_het() || site.pos.saturating_sub(end) + 1 < self.options.window {
            debug!(pos = site.pos, "unphasable call closes block");
            site.set_filter(VcfFilter::PhasingConflict);
        }
        let mut ready = self.close_block(evidence)?;
        ready.push(site);
        Ok(ready)
    }

    /// Close any open block at end of stream and return what remains.
    pub fn finish<R: ReadEvidence + ?Sized>(
        &mut self,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, EvidenceError> {
        match self.state {
            BlockState::Idle => Ok(mem::take(&mut self.buffer)),
            BlockState::InBlock { .. } => self.close_block(evidence),
        }
    }

    fn close_block<R: ReadEvidence + ?Sized>(
        &mut self,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, EvidenceError> {
        let BlockState::InBlock {
            start,
            end,
            het_count,
        } = self.state
        else {
            return Ok(mem::take(&mut self.buffer));
        };
        self.state = BlockState::Idle;
        self.chrom = None;

        let outcome = if het_count > 1 {
            self.phase_block(start, end, evidence)?
        } else {
            PhasingOutcome::TooFewHets { het_count }
        };
        match &outcome {
            PhasingOutcome::Phased { .. } => info!(
                start,
                end,
                reads = self.observations.usable(),
                "emitted phased block"
            ),
            PhasingOutcome::TooFewHets { .. } => {}
            declined => debug!(start, end, outcome = ?declined, "declined to phase block"),
        }
        self.last_outcome = Some(outcome);
        Ok(mem::take(&mut self.buffer))
    }

    fn phase_block<R: ReadEvidence + ?Sized>(
        &mut self,
        start: u32,
        end: u32,
        evidence: &mut R,
    ) -> Result<PhasingOutcome, EvidenceError> {
        let block: Vec<&SiteCall> = self
            .buffer
            .iter()
            .filter(|site| (start..=end).contains(&site.pos))
            .collect();
        let contiguous = block.len() == (end - start + 1) as usize
            && block
                .iter()
                .zip(start..)
                .all(|(site, pos)| site.pos == pos);
        if !contiguous {
            return Ok(PhasingOutcome::NonContiguous);
        }
        let reference: String = block.iter().map(|site| char::from(site.reference)).collect();
        let chrom = Arc::clone(&block[0].chrom);

        self.collect_observations(&chrom, start, end, evidence)?;
        let usable = self.observations.usable();
        if usable < self.options.min_spanning_reads {
            return Ok(PhasingOutcome::InsufficientReads { usable });
        }
        let Some(((first, first_count), (second, second_count))) = self.observations.top_two()
        else {
            return Ok(PhasingOutcome::NotDiploid {
                max_allele_frac: 1.0,
            });
        };

        let max_allele_frac = f64::from(first_count + second_count) / f64::from(usable);
        if max_allele_frac < self.options.min_max_allele_frac {
            return Ok(PhasingOutcome::NotDiploid { max_allele_frac });
        }
        let relative_allele_frac = f64::from(second_count) / f64::from(first_count);
        if relative_allele_frac < self.options.min_relative_allele_frac {
            return Ok(PhasingOutcome::AlleleImbalance {
                relative_allele_frac,
            });
        }

        let top = [(first, first_count), (second, second_count)];
        let ref_present = top.iter().any(|(allele, _)| *allele == reference);
        let alts: Vec<(&str, u32)> = top
            .into_iter()
            .filter(|(allele, _)| *allele != reference)
            .collect();
        let phased_alt = alts
            .iter()
            .map(|(allele, _)| *allele)
            .collect::<Vec<_>>()
            .join(",");
        let phased_ad = std::iter::once(self.observations.count(&reference))
            .chain(alts.iter().map(|(_, count)| *count))
            .map(|count| count.to_string())
            .collect::<Vec<_>>()
            .join(",");

        self.emit_phased_record(start, end, reference, phased_alt, phased_ad, ref_present);
        Ok(PhasingOutcome::Phased { start, end })
    }

    fn collect_observations<R: ReadEvidence + ?Sized>(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        evidence: &mut R,
    ) -> Result<(), EvidenceError> {
        self.observations.clear();
        for read in evidence.reads_at(chrom, start)? {
            let Some(span) = read.span_offsets(start, end) else {
                continue;
            };
            if read.mapq < self.options.min_mapq {
                self.observations.reject();
                continue;
            }
            let (Some(bases), Some(quals)) =
                (read.sequence.get(span.clone()), read.qualities.get(span))
            else {
                self.observations.reject();
                continue;
            };
            let clean = bases.iter().all(|&base| base_index(base).is_some())
                && quals.iter().all(|&q| q >= self.options.min_baseq);
            if clean {
                let allele: String = bases
                    .iter()
                    .map(|&base| char::from(base.to_ascii_uppercase()))
                    .collect();
                self.observations.observe(allele);
            } else {
                self.observations.reject();
            }
        }
        Ok(())
    }

    /// Turn the block's first het call into the phased record and drop the
    /// calls it subsumes. Calls after the last het position stay buffered.
    fn emit_phased_record(
        &mut self,
        start: u32,
        end: u32,
        reference: String,
        phased_alt: String,
        phased_ad: String,
        ref_present: bool,
    ) {
        let in_block = |site: &SiteCall| (start..=end).contains(&site.pos);
        let mut merged = self
            .buffer
            .iter()
            .filter(|site| in_block(*site) && site.is_het());
        let Some(first) = merged.next() else {
            return;
        };
        let mut filters = first.smod.shared.filters.clone();
        let mut gq = first.smod.shared.gq;
        let mut gqx = first.smod.shared.gqx;
        let mut qscore = first.qscore;
        for site in merged {
            filters.extend_from(&site.smod.shared.filters);
            gq = gq.min(site.smod.shared.gq);
            gqx = gqx.min(site.smod.shared.gqx);
            qscore = match (qscore, site.qscore) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        let Some(idx) = self
            .buffer
            .iter()
            .position(|site| site.pos == start && site.is_het())
        else {
            return;
        };
        let usable = self.observations.usable();
        let unused = self.observations.unused();
        let rep = &mut self.buffer[idx];
        rep.phased_ref = reference;
        rep.phased_alt = phased_alt;
        rep.phased_ad = phased_ad;
        rep.smod.is_phased_region = true;
        rep.smod.shared.max_gt = Digt::AC.index();
        rep.dgt.ref_gt = if ref_present { Digt::AA } else { Digt::GG };
        rep.smod.shared.filters = filters;
        rep.smod.shared.gq = gq;
        rep.smod.shared.gqx = gqx;
        rep.qscore = qscore;
        rep.n_used_calls = usable;
        rep.n_unused_calls = unused;

        self.buffer
            .retain(|site| !(site.pos > start && site.pos <= end));
    }
}
