//! # Calibrated variant scoring and block phasing
//!
//! This library takes per-position site and indel calls from an upstream
//! genotyper and finishes them for emission:
//!
//! 1. **Scoring**: a [`ModelRegistry`] holds named rule or logistic models
//!    keyed by nine variant cases and assigns quality scores and filters
//! 2. **Overlap resolution**: overlapping het indels become het-alt pairs
//!    with per-offset ploidy, anything else is flagged as a conflict
//! 3. **Phasing**: a [`BlockPhaser`] buffers adjacent het sites and, when
//!    spanning reads show a clean diploid split, collapses them into one
//!    multi-base record
//!
//! ## Usage Example
//!
//! ```ignore
//! use varscore::{CallStream, ModelRegistry, InMemoryReads};
//!
//! let mut registry = ModelRegistry::default();
//! registry.load_models(Path::new("models.json"))?;
//! registry.set_model("QScoreHPDRE")?;
//!
//! let mut stream = CallStream::new(&registry, PhasingOptions::default());
//! for site in sites {
//!     for ready in stream.push_site(site, &mut reads)? {
//!         emit(ready);
//!     }
//! }
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod calls; // Site and indel call records
pub mod config; // Run-time options
pub mod evidence; // Read evidence providers
pub mod model; // Scoring models and variant cases
pub mod phasing; // Block phasing
pub mod registry; // Model registry and dispatch
pub mod types; // Aligned reads and CIGAR operations

// Re-exports for convenience
pub use calls::{CallRecord, ContractError, FilterSet, IndelCall, SiteCall, VcfFilter};
pub use config::{GvcfOptions, PhasingOptions, Settings};
pub use evidence::{BamReadEvidence, EvidenceError, InMemoryReads, ReadEvidence};
pub use model::{ConfigError, ModelKind, ScoringModel, VariantCase, VariantType, Zygosity};
pub use phasing::{BlockPhaser, PhasingOutcome};
pub use registry::{
    ActiveModel, ModelRegistry, OverlapOutcome, OverlapTracker, Released, DEFAULT_MODEL_NAME,
};
pub use types::{AlignedRead, CigarOp, CigarOpKind};

use thiserror::Error;

/// Errors surfaced while processing a call stream.
#[derive(Error, Debug)]
pub enum VarScoreError {
    /// Incomplete or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A call record broke an upstream invariant.
    #[error("call record contract violated: {0}")]
    Contract(#[from] ContractError),

    /// Read evidence could not be fetched.
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
}

/// Stream driver: classifies calls with a shared registry and phases sites.
///
/// One instance handles one position-sorted stream; the registry is only
/// borrowed, so parallel streams can share it.
#[derive(Debug)]
pub struct CallStream<'r> {
    registry: &'r ModelRegistry,
    phaser: BlockPhaser,
    sites_seen: usize,
    indels_seen: usize,
}

impl<'r> CallStream<'r> {
    /// Create a stream over a configured registry.
    pub fn new(registry: &'r ModelRegistry, phasing: PhasingOptions) -> Self {
        Self {
            registry,
            phaser: BlockPhaser::new(phasing),
            sites_seen: 0,
            indels_seen: 0,
        }
    }

    /// Classify a site and feed it to the phaser; returns the sites ready to emit.
    pub fn push_site<R: ReadEvidence + ?Sized>(
        &mut self,
        mut site: SiteCall,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, VarScoreError> {
        self.registry.classify_site(&mut site)?;
        self.sites_seen += 1;
        Ok(self.phaser.add_site(site, evidence)?)
    }

    /// Classify a site without phasing.
    pub fn classify_site(&mut self, mut site: SiteCall) -> Result<SiteCall, VarScoreError> {
        self.registry.classify_site(&mut site)?;
        self.sites_seen += 1;
        Ok(site)
    }

    /// Classify a group of indels sharing genomic span.
    pub fn push_indels(&mut self, mut indels: Vec<IndelCall>) -> Result<Vec<IndelCall>, VarScoreError> {
        self.registry.classify_indels(&mut indels)?;
        self.indels_seen += indels.len();
        Ok(indels)
    }

    /// Flush the phaser at end of stream.
    pub fn finish<R: ReadEvidence + ?Sized>(
        &mut self,
        evidence: &mut R,
    ) -> Result<Vec<SiteCall>, VarScoreError> {
        Ok(self.phaser.finish(evidence)?)
    }

    /// Sites and indels classified so far.
    pub fn counts(&self) -> (usize, usize) {
        (self.sites_seen, self.indels_seen)
    }

    /// The phasing assembler.
    pub fn phaser(&self) -> &BlockPhaser {
        &self.phaser
    }

    /// The registry classifying this stream.
    pub fn registry(&self) -> &'r ModelRegistry {
        self.registry
    }
}
