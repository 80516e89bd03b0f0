//! Run-time options for the legacy filter path and the phasing assembler.
//!
//! Both option groups deserialize from JSON with every field optional, so a
//! settings file only needs to name what it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::ConfigError;

/// Thresholds of the legacy hard-filter classifier. `None` disables a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GvcfOptions {
    /// Minimum GQX for a call to pass.
    pub min_gqx: Option<i32>,
    /// Maximum depth as a multiple of the chromosome's average depth.
    pub max_depth_factor: Option<f64>,
    /// Maximum fraction of basecalls filtered out upstream.
    pub max_base_filt: Option<f64>,
    /// Maximum SNV strand bias.
    pub max_snv_sb: Option<f64>,
    /// Maximum homopolymer length around an SNV.
    pub max_snv_hpol: Option<u32>,
    /// Maximum reference repeat count for indels in short-unit repeats.
    pub max_ref_rep: Option<u32>,
}

impl Default for GvcfOptions {
    fn default() -> Self {
        Self {
            min_gqx: Some(30),
            max_depth_factor: Some(3.0),
            max_base_filt: Some(0.4),
            max_snv_sb: Some(10.0),
            max_snv_hpol: Some(6),
            max_ref_rep: Some(8),
        }
    }
}

impl GvcfOptions {
    /// Options with every filter disabled.
    pub fn disabled() -> Self {
        Self {
            min_gqx: None,
            max_depth_factor: None,
            max_base_filt: None,
            max_snv_sb: None,
            max_snv_hpol: None,
            max_ref_rep: None,
        }
    }

    /// Set the minimum GQX.
    pub fn with_min_gqx(mut self, min_gqx: Option<i32>) -> Self {
        self.min_gqx = min_gqx;
        self
    }

    /// Set the depth factor.
    pub fn with_max_depth_factor(mut self, factor: Option<f64>) -> Self {
        self.max_depth_factor = factor;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_depth_factor", self.max_depth_factor),
            ("max_base_filt", self.max_base_filt),
            ("max_snv_sb", self.max_snv_sb),
        ];
        for (name, value) in positive {
            if value.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
                return Err(ConfigError::InvalidOption(format!(
                    "{name} must be a positive number"
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of the phasing block assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhasingOptions {
    /// A non-het call extends the open block while `pos - block_end + 1 < window`.
    pub window: u32,
    /// Minimum mapping quality of a spanning read.
    pub min_mapq: u8,
    /// Minimum base quality of every base in a read's block substring.
    pub min_baseq: u8,
    /// Minimum usable spanning reads before a block is considered.
    pub min_spanning_reads: u32,
    /// Minimum fraction of usable reads carried by the two top alleles.
    pub min_max_allele_frac: f64,
    /// Minimum ratio of the second allele's count to the first's.
    pub min_relative_allele_frac: f64,
}

impl Default for PhasingOptions {
    fn default() -> Self {
        Self {
            window: 3,
            min_mapq: 20,
            min_baseq: 17,
            min_spanning_reads: 10,
            min_max_allele_frac: 0.8,
            min_relative_allele_frac: 0.5,
        }
    }
}

impl PhasingOptions {
    /// Set the extension window.
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::InvalidOption(
                "phasing window must be > 0".to_string(),
            ));
        }
        for (name, value) in [
            ("min_max_allele_frac", self.min_max_allele_frac),
            ("min_relative_allele_frac", self.min_relative_allele_frac),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidOption(format!(
                    "{name} must lie in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Settings file: both option groups, each optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Legacy filter thresholds.
    pub gvcf: GvcfOptions,
    /// Phasing parameters.
    pub phasing: PhasingOptions,
}

impl Settings {
    /// Parse and validate settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Check both option groups.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gvcf.validate()?;
        self.phasing.validate()
    }
}
