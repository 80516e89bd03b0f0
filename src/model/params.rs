use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{ConfigError, ModelKind, VariantCase};
use crate::calls::FeatureMap;

/// Sub-table holding the quality cutoff and optional hard-filter cutoffs.
pub const CUTOFF: &str = "Cutoff";
/// Sub-table of additive feature adjustments (population means).
pub const POP_MEAN: &str = "PopMean";
/// Sub-table of feature scale factors (population standard deviations).
pub const POP_STD: &str = "PopStd";
/// Sub-table of logistic regression coefficients.
pub const COEFFICIENTS: &str = "Coefs";
/// Entry of [`CUTOFF`] holding the quality-score cutoff.
pub const QSCORE_CUTOFF: &str = "Q";
/// Entry of [`COEFFICIENTS`] holding the intercept.
pub const INTERCEPT: &str = "Intercept";

/// Sub-table name → feature name → value, for one variant case.
pub type CaseParameters = BTreeMap<String, FeatureMap>;

/// Full parameter table of a model.
pub type ParameterTable = BTreeMap<VariantCase, CaseParameters>;

/// One model entry of a parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    /// Model name.
    pub name: String,
    /// Model type.
    pub kind: ModelKind,
    /// Parameters keyed by variant case.
    pub table: ParameterTable,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModel {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Model", default)]
    cases: BTreeMap<String, CaseParameters>,
}

/// Parse the JSON text of a parameter file into model definitions.
pub fn parse_parameter_file(text: &str) -> Result<Vec<ModelDefinition>, ConfigError> {
    let raw: BTreeMap<String, RawModel> = serde_json::from_str(text)?;
    raw.into_iter()
        .map(|(name, model)| {
            let kind = ModelKind::from_tag(&model.kind).ok_or_else(|| {
                ConfigError::UnknownModelType {
                    model: name.clone(),
                    tag: model.kind.clone(),
                }
            })?;
            let mut table = ParameterTable::new();
            for (label, params) in model.cases {
                let case = VariantCase::from_label(&label).ok_or_else(|| {
                    ConfigError::UnknownVariantCase {
                        model: name.clone(),
                        label: label.clone(),
                    }
                })?;
                table.insert(case, params);
            }
            Ok(ModelDefinition { name, kind, table })
        })
        .collect()
}

/// Read and parse a parameter file.
pub fn read_parameter_file(path: &Path) -> Result<Vec<ModelDefinition>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_parameter_file(&text)
}
