//! Calibrated scoring models.
//!
//! A model is a named parameter table keyed by [`VariantCase`]. Rule models
//! compare genotype quality against a per-case cutoff and apply the hard
//! filters stored next to it; logistic models compute a quality score from
//! normalised features and compare that against the cutoff instead.

mod filters;
mod params;
mod scoring;
mod var_case;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use filters::{apply_filters, HardFilterCutoffs, QualityGate};
pub use params::{
    parse_parameter_file, read_parameter_file, CaseParameters, ModelDefinition, ParameterTable,
    COEFFICIENTS, CUTOFF, INTERCEPT, POP_MEAN, POP_STD, QSCORE_CUTOFF,
};
pub use scoring::{log_odds, normalize, qscore_from_log_odds, ScoringModel, MAX_QSCORE};
pub use var_case::{VariantCase, VariantType, Zygosity};

/// How a model turns features into a filter decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Static per-case cutoffs.
    Rule,
    /// Logistic regression over normalised features.
    Logistic,
}

impl ModelKind {
    /// Parse the `Type` tag of a parameter file entry.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_uppercase().as_str() {
            "RULE" | "RULES" => Some(ModelKind::Rule),
            "LOGISTIC" => Some(ModelKind::Logistic),
            _ => None,
        }
    }

    /// Canonical tag.
    pub fn tag(self) -> &'static str {
        match self {
            ModelKind::Rule => "RULE",
            ModelKind::Logistic => "LOGISTIC",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Setup-time failures: unreadable or malformed inputs and incomplete models.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Parameter file is not valid JSON of the expected shape.
    #[error("malformed JSON input: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Unrecognised model `Type` tag.
    #[error("model '{model}' has unknown type '{tag}'")]
    UnknownModelType {
        /// Model name.
        model: String,
        /// Offending tag.
        tag: String,
    },
    /// Unrecognised variant case label.
    #[error("model '{model}' references unknown variant case '{label}'")]
    UnknownVariantCase {
        /// Model name.
        model: String,
        /// Offending label.
        label: String,
    },
    /// The same model name was loaded with two different types.
    #[error("model '{model}' is already loaded as {existing}, cannot add {requested} parameters")]
    ModelKindMismatch {
        /// Model name.
        model: String,
        /// Type already registered.
        existing: ModelKind,
        /// Type of the new parameters.
        requested: ModelKind,
    },
    /// No model with this name is loaded.
    #[error("unknown scoring model '{name}' (available: {})", .available.join(", "))]
    UnknownModel {
        /// Requested name.
        name: String,
        /// Names that are loaded.
        available: Vec<String>,
    },
    /// Model has no parameters for a case it was asked to score.
    #[error("model '{model}' has no parameters for variant case {case}")]
    UnconfiguredCase {
        /// Model name.
        model: String,
        /// Variant case.
        case: VariantCase,
    },
    /// A required sub-table is missing for a configured case.
    #[error("model '{model}' is missing the {table} table for variant case {case}")]
    MissingSubTable {
        /// Model name.
        model: String,
        /// Variant case.
        case: VariantCase,
        /// Sub-table name.
        table: &'static str,
    },
    /// A required entry is missing from a sub-table.
    #[error("model '{model}' is missing {table}.{feature} for variant case {case}")]
    MissingParameter {
        /// Model name.
        model: String,
        /// Variant case.
        case: VariantCase,
        /// Sub-table name.
        table: &'static str,
        /// Entry name.
        feature: &'static str,
    },
    /// A parameter value cannot be used.
    #[error("model '{model}' has invalid {table}.{feature} = {value} for variant case {case}")]
    InvalidParameter {
        /// Model name.
        model: String,
        /// Variant case.
        case: VariantCase,
        /// Sub-table name.
        table: &'static str,
        /// Entry name.
        feature: String,
        /// Offending value.
        value: f64,
    },
    /// A run-time option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// Chromosome depth table line could not be parsed.
    #[error("chromosome depth table line {line}: {message}")]
    DepthTable {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}
