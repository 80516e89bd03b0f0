use std::f64::consts::LN_10;

use tracing::trace;

use super::{
    apply_filters, CaseParameters, ConfigError, HardFilterCutoffs, ModelKind, ParameterTable,
    QualityGate, VariantCase, COEFFICIENTS, CUTOFF, INTERCEPT, POP_MEAN, POP_STD, QSCORE_CUTOFF,
};
use crate::calls::{CallRecord, FeatureMap};

/// Upper bound on calibrated quality scores.
pub const MAX_QSCORE: i32 = 60;

/// Feature a rule model compares against its cutoff.
const RULE_SCORE_FEATURE: &str = "GQX";

/// One named, fully parameterised scoring model.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    name: String,
    kind: ModelKind,
    params: ParameterTable,
}

impl ScoringModel {
    /// Create a model with an empty parameter table.
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: ParameterTable::new(),
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model type.
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Whether the model computes logistic scores.
    pub fn is_logistic_model(&self) -> bool {
        self.kind == ModelKind::Logistic
    }

    /// Parameter table.
    pub fn parameters(&self) -> &ParameterTable {
        &self.params
    }

    /// Variant cases with parameters.
    pub fn cases(&self) -> impl Iterator<Item = VariantCase> + '_ {
        self.params.keys().copied()
    }

    /// Merge a parameter table; a case already present is replaced wholesale.
    pub fn add_parameters(&mut self, table: ParameterTable) {
        for (case, params) in table {
            self.params.insert(case, params);
        }
    }

    /// Check that every configured case can be scored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (&case, params) in &self.params {
            self.var_threshold(case)?;
            if !self.is_logistic_model() {
                continue;
            }
            self.sub_table(case, params, COEFFICIENTS)?;
            if let Some(scales) = params.get(POP_STD) {
                for (feature, &value) in scales {
                    if value == 0.0 || !value.is_finite() {
                        return Err(ConfigError::InvalidParameter {
                            model: self.name.clone(),
                            case,
                            table: POP_STD,
                            feature: feature.clone(),
                            value,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Integer quality cutoff configured for `case`.
    pub fn var_threshold(&self, case: VariantCase) -> Result<i32, ConfigError> {
        let params = self.case_parameters(case)?;
        let cutoffs = self.sub_table(case, params, CUTOFF)?;
        cutoffs
            .get(QSCORE_CUTOFF)
            .map(|&value| round_half_up(value))
            .ok_or_else(|| ConfigError::MissingParameter {
                model: self.name.clone(),
                case,
                table: CUTOFF,
                feature: QSCORE_CUTOFF,
            })
    }

    /// Score a call of the given case and apply the resulting filters.
    ///
    /// `chrom_depth` is the chromosome's average depth when a depth table is
    /// loaded; depth cutoffs are skipped otherwise.
    pub fn score_instance<C: CallRecord + ?Sized>(
        &self,
        case: VariantCase,
        features: &FeatureMap,
        call: &mut C,
        chrom_depth: Option<f64>,
    ) -> Result<(), ConfigError> {
        let cutoff = self.var_threshold(case)?;
        match self.kind {
            ModelKind::Rule => {
                let params = self.case_parameters(case)?;
                let cutoff_table = self.sub_table(case, params, CUTOFF)?;
                let score = features
                    .get(RULE_SCORE_FEATURE)
                    .map(|&value| round_half_up(value))
                    .unwrap_or(call.shared().gqx);
                call.set_qscore(cutoff);
                let gate = QualityGate {
                    score,
                    cutoff,
                    filter: case.qscore_filter(),
                };
                apply_filters(
                    call,
                    Some(gate),
                    &HardFilterCutoffs::from_cutoff_table(cutoff_table, chrom_depth),
                );
            }
            ModelKind::Logistic => {
                let score = self.logistic_score(case, features)?;
                trace!(model = %self.name, %case, score, cutoff, "logistic score");
                call.set_qscore(score);
                let gate = QualityGate {
                    score,
                    cutoff,
                    filter: case.qscore_filter(),
                };
                apply_filters(call, Some(gate), &HardFilterCutoffs::default());
            }
        }
        Ok(())
    }

    /// Logistic quality score of a feature map for `case`.
    pub fn logistic_score(
        &self,
        case: VariantCase,
        features: &FeatureMap,
    ) -> Result<i32, ConfigError> {
        let params = self.case_parameters(case)?;
        let coefficients = self.sub_table(case, params, COEFFICIENTS)?;
        let empty = FeatureMap::new();
        let adjust = params.get(POP_MEAN).unwrap_or(&empty);
        let scale = params.get(POP_STD).unwrap_or(&empty);
        let normalized = normalize(features, adjust, scale);
        Ok(qscore_from_log_odds(log_odds(&normalized, coefficients)))
    }

    /// Digest of the model name, type and every parameter.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.kind.tag().as_bytes());
        for (case, params) in &self.params {
            hasher.update(case.label().as_bytes());
            for (table, entries) in params {
                hasher.update(table.as_bytes());
                for (feature, value) in entries {
                    hasher.update(feature.as_bytes());
                    hasher.update(&value.to_le_bytes());
                }
            }
        }
        hasher.finalize()
    }

    fn case_parameters(&self, case: VariantCase) -> Result<&CaseParameters, ConfigError> {
        self.params
            .get(&case)
            .ok_or_else(|| ConfigError::UnconfiguredCase {
                model: self.name.clone(),
                case,
            })
    }

    fn sub_table<'a>(
        &self,
        case: VariantCase,
        params: &'a CaseParameters,
        table: &'static str,
    ) -> Result<&'a FeatureMap, ConfigError> {
        params.get(table).ok_or_else(|| ConfigError::MissingSubTable {
            model: self.name.clone(),
            case,
            table,
        })
    }
}

/// Normalise features: `(value - adjust) / scale`.
///
/// Features absent from both tables pass through unchanged; a missing
/// adjustment is 0 and a missing scale is 1.
pub fn normalize(features: &FeatureMap, adjust: &FeatureMap, scale: &FeatureMap) -> FeatureMap {
    features
        .iter()
        .map(|(name, &value)| {
            let shift = adjust.get(name).copied().unwrap_or(0.0);
            let factor = scale.get(name).copied().unwrap_or(1.0);
            (name.clone(), (value - shift) / factor)
        })
        .collect()
}

/// Intercept plus the dot product of coefficients with features.
///
/// A coefficient named `A:B` is an interaction term and multiplies the
/// product of features `A` and `B`. Missing features count as 0.
pub fn log_odds(features: &FeatureMap, coefficients: &FeatureMap) -> f64 {
    let intercept = coefficients.get(INTERCEPT).copied().unwrap_or(0.0);
    coefficients
        .iter()
        .filter(|(name, _)| name.as_str() != INTERCEPT)
        .fold(intercept, |sum, (name, &coefficient)| {
            let term = name
                .split(':')
                .map(|token| features.get(token).copied().unwrap_or(0.0))
                .fold(coefficient, |acc, value| acc * value);
            sum + term
        })
}

/// Phred quality from log-odds of the call being correct.
///
/// The error probability is `p = 1 / (1 + e^lo)`; the score is
/// `floor(-10·log10(p) + 0.5)` clamped to `[0, MAX_QSCORE]`. `-10·log10(p)`
/// is evaluated as `10·softplus(lo)/ln 10` to stay finite for large `lo`.
pub fn qscore_from_log_odds(log_odds: f64) -> i32 {
    if log_odds.is_nan() {
        return 0;
    }
    let softplus = if log_odds > 30.0 {
        log_odds
    } else {
        log_odds.exp().ln_1p()
    };
    let phred = 10.0 * softplus / LN_10;
    (phred + 0.5).floor().clamp(0.0, f64::from(MAX_QSCORE)) as i32
}

fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
