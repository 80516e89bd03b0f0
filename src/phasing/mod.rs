//! Read-backed phasing of adjacent heterozygous site calls.
//!
//! A block opens on a het call and grows while het calls keep arriving, or
//! while non-het calls stay within the window of the last het position.
//! When it closes, reads spanning the whole block vote on its two haplotypes;
//! a clean diploid split collapses the block into one multi-base record.

mod alleles;
mod phaser;

pub use alleles::AlleleObservations;
pub use phaser::{BlockPhaser, PhasingOutcome};
