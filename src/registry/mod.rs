//! Model registry: loaded models, the active selection and call dispatch.
//!
//! The active model is resolved once by [`ModelRegistry::set_model`] into an
//! [`ActiveModel`]; classification then dispatches on that value without any
//! name lookup. After setup the registry is only read, so one instance can be
//! shared across chromosome streams.

mod depth;
mod overlap;
mod tracker;

use std::path::Path;

use tracing::{debug, info, trace, warn};

pub use depth::{ChromDepth, ChromDepthTable, FALLBACK_DEPTH};
pub use overlap::{resolve_overlap, OverlapOutcome};
pub use tracker::{OverlapTracker, Released};

use crate::calls::{
    CallRecord, ContractError, IndelCall, IndelGenotype, ModifiedGenotype, SiteCall, VcfFilter,
};
use crate::config::GvcfOptions;
use crate::model::{
    apply_filters, parse_parameter_file, read_parameter_file, ConfigError, HardFilterCutoffs,
    ModelDefinition, QualityGate, ScoringModel, VariantCase,
};
use crate::VarScoreError;

/// Name selecting the legacy hard-filter classifier.
pub const DEFAULT_MODEL_NAME: &str = "DEFAULT";

/// Classifier selected for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveModel {
    /// Legacy thresholds from [`GvcfOptions`].
    #[default]
    Default,
    /// Index into the registry's loaded models.
    Calibrated(usize),
}

/// Named scoring models plus the legacy classifier.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    options: GvcfOptions,
    models: Vec<ScoringModel>,
    active: ActiveModel,
    depths: Option<ChromDepthTable>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(GvcfOptions::default())
    }
}

impl ModelRegistry {
    /// Registry with no calibrated models; the legacy classifier is active.
    pub fn new(options: GvcfOptions) -> Self {
        Self {
            options,
            models: Vec::new(),
            active: ActiveModel::Default,
            depths: None,
        }
    }

    /// Legacy filter options.
    pub fn options(&self) -> &GvcfOptions {
        &self.options
    }

    /// Load every model in a parameter file. Returns the number of models
    /// defined by the file.
    pub fn load_models(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let definitions = read_parameter_file(path)?;
        let count = self.add_definitions(definitions)?;
        info!(path = %path.display(), models = count, "loaded scoring models");
        Ok(count)
    }

    /// Load every model in parameter-file JSON text.
    pub fn load_models_from_str(&mut self, text: &str) -> Result<usize, ConfigError> {
        let definitions = parse_parameter_file(text)?;
        self.add_definitions(definitions)
    }

    fn add_definitions(&mut self, definitions: Vec<ModelDefinition>) -> Result<usize, ConfigError> {
        let count = definitions.len();
        for definition in definitions {
            self.add_model_parameters(definition)?;
        }
        for model in &self.models {
            model.validate()?;
        }
        Ok(count)
    }

    /// Merge one model definition into the registry.
    ///
    /// Parameters for an already loaded name are merged case by case; the
    /// model type must agree.
    pub fn add_model_parameters(&mut self, definition: ModelDefinition) -> Result<(), ConfigError> {
        if definition.name == DEFAULT_MODEL_NAME {
            warn!("ignoring parameters for reserved model name {DEFAULT_MODEL_NAME}");
            return Ok(());
        }
        match self.models.iter_mut().find(|m| m.name() == definition.name) {
            Some(existing) if existing.kind() != definition.kind => {
                Err(ConfigError::ModelKindMismatch {
                    model: definition.name,
                    existing: existing.kind(),
                    requested: definition.kind,
                })
            }
            Some(existing) => {
                existing.add_parameters(definition.table);
                Ok(())
            }
            None => {
                let mut model = ScoringModel::new(definition.name, definition.kind);
                model.add_parameters(definition.table);
                debug!(
                    model = model.name(),
                    kind = %model.kind(),
                    cases = model.parameters().len(),
                    "registered scoring model"
                );
                self.models.push(model);
                Ok(())
            }
        }
    }

    /// Loaded calibrated models, in load order.
    pub fn models(&self) -> &[ScoringModel] {
        &self.models
    }

    /// Look up a loaded model.
    pub fn model(&self, name: &str) -> Option<&ScoringModel> {
        self.models.iter().find(|model| model.name() == name)
    }

    /// Select the active classifier by name.
    pub fn set_model(&mut self, name: &str) -> Result<(), ConfigError> {
        self.active = if name == DEFAULT_MODEL_NAME {
            ActiveModel::Default
        } else {
            let idx = self
                .models
                .iter()
                .position(|model| model.name() == name)
                .ok_or_else(|| ConfigError::UnknownModel {
                    name: name.to_string(),
                    available: std::iter::once(DEFAULT_MODEL_NAME.to_string())
                        .chain(self.models.iter().map(|m| m.name().to_string()))
                        .collect(),
                })?;
            ActiveModel::Calibrated(idx)
        };
        match self.active_model() {
            Some(model) => info!(
                model = model.name(),
                kind = %model.kind(),
                fingerprint = %model.fingerprint(),
                "selected scoring model"
            ),
            None => info!("selected legacy hard-filter classifier"),
        }
        Ok(())
    }

    /// Active selection.
    pub fn active(&self) -> ActiveModel {
        self.active
    }

    /// Name of the active classifier.
    pub fn model_name(&self) -> &str {
        self.active_model()
            .map_or(DEFAULT_MODEL_NAME, ScoringModel::name)
    }

    /// Active calibrated model, `None` on the legacy path.
    pub fn active_model(&self) -> Option<&ScoringModel> {
        match self.active {
            ActiveModel::Default => None,
            ActiveModel::Calibrated(idx) => self.models.get(idx),
        }
    }

    /// Whether the active model is logistic.
    pub fn is_current_logistic(&self) -> bool {
        self.active_model()
            .is_some_and(ScoringModel::is_logistic_model)
    }

    /// Quality cutoff the active classifier applies to `case`.
    ///
    /// The legacy path uses `min_gqx` for every case, `None` when disabled.
    pub fn case_cutoff(&self, case: VariantCase) -> Result<Option<i32>, ConfigError> {
        match self.active_model() {
            Some(model) => model.var_threshold(case).map(Some),
            None => Ok(self.options.min_gqx),
        }
    }

    /// Load chromosome depth statistics. Returns the number of chromosomes.
    pub fn load_chr_depth_stats(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let table = ChromDepthTable::from_path(path)?;
        let count = table.len();
        info!(path = %path.display(), chromosomes = count, "loaded chromosome depths");
        self.depths = Some(table);
        Ok(count)
    }

    /// Install chromosome depth statistics.
    pub fn set_chrom_depths(&mut self, table: ChromDepthTable) {
        self.depths = Some(table);
    }

    /// Depth statistics for a chromosome, or the fallback.
    pub fn chrom_depth(&self, chrom: &str) -> ChromDepth {
        self.known_depth(chrom).unwrap_or_default()
    }

    /// Depth statistics only when the chromosome is in a loaded table.
    fn known_depth(&self, chrom: &str) -> Option<ChromDepth> {
        self.depths.as_ref().and_then(|table| table.get(chrom))
    }

    /// Score and filter a site call with the active classifier.
    ///
    /// Only called SNVs reach a calibrated model; every other site takes the
    /// legacy path. Conflict filters are applied either way.
    pub fn classify_site(&self, site: &mut SiteCall) -> Result<(), VarScoreError> {
        if !site.smod.is_unknown {
            site.max_genotype()?;
        }
        match (self.active_model(), VariantCase::for_site(site)) {
            (Some(model), Some(case)) => {
                let depth = self.known_depth(&site.chrom);
                let features =
                    site.qscore_features(depth.unwrap_or_default().average);
                model.score_instance(case, &features, site, depth.map(|d| d.average))?;
                trace!(pos = site.pos, %case, qscore = ?site.qscore, "scored site");
            }
            _ => self.default_classify_site(site),
        }
        apply_site_conflicts(site);
        Ok(())
    }

    /// Legacy classification of a site: `min_gqx` plus the hard filters.
    /// Sites without a meaningful GQX are left unfiltered.
    pub fn default_classify_site(&self, site: &mut SiteCall) {
        if !site.smod.is_gqx() {
            return;
        }
        let gate = self.options.min_gqx.map(|cutoff| QualityGate {
            score: site.smod.shared.gqx,
            cutoff,
            filter: VcfFilter::LowGqx,
        });
        let depth = self.known_depth(&site.chrom).map(|d| d.average);
        apply_filters(site, gate, &HardFilterCutoffs::from_options(&self.options, depth));
    }

    /// Derive an indel's shared modifiers from its genotyper output.
    pub fn set_indel_modifiers(&self, indel: &mut IndelCall) -> Result<(), ContractError> {
        let called = IndelGenotype::from_index(indel.dindel.max_gt).map_err(|_| {
            ContractError::IndelGenotypeIndex {
                index: indel.dindel.max_gt,
                haploid: indel.dindel.is_haploid,
            }
        })?;
        let shared = &mut indel.imod.shared;
        shared.max_gt = called.index();
        shared.gq = indel.dindel.max_gt_qphred;
        shared.gqx = if called == IndelGenotype::NoIndel {
            shared.gq
        } else {
            shared.gq.min(indel.dindel.indel_qphred)
        };
        Ok(())
    }

    /// Score and filter one indel whose modifiers are already set.
    pub fn classify_indel(&self, indel: &mut IndelCall) -> Result<(), VarScoreError> {
        indel.max_genotype()?;
        match (self.active_model(), VariantCase::for_indel(indel)) {
            (Some(model), Some(case)) => {
                let depth = self.known_depth(&indel.chrom);
                let features =
                    indel.qscore_features(depth.unwrap_or_default().average);
                model.score_instance(case, &features, indel, depth.map(|d| d.average))?;
                trace!(pos = indel.pos, %case, qscore = ?indel.qscore, "scored indel");
            }
            _ => self.default_classify_indel(indel),
        }
        if indel.dindel.is_haploid && indel.is_het() && !indel.imod.is_overlap {
            indel.set_filter(VcfFilter::PloidyConflict);
        }
        Ok(())
    }

    /// Legacy classification of an indel: `min_gqx` plus the hard filters.
    pub fn default_classify_indel(&self, indel: &mut IndelCall) {
        let gate = self.options.min_gqx.map(|cutoff| QualityGate {
            score: indel.imod.shared.gqx,
            cutoff,
            filter: VcfFilter::LowGqx,
        });
        let depth = self.known_depth(&indel.chrom).map(|d| d.average);
        apply_filters(indel, gate, &HardFilterCutoffs::from_options(&self.options, depth));
    }

    /// Classify a group of indels sharing genomic span.
    ///
    /// Modifiers are derived and overlap resolved before any indel is scored,
    /// since the het-alt case and per-offset ploidy depend on the overlap.
    pub fn classify_indels(&self, indels: &mut [IndelCall]) -> Result<OverlapOutcome, VarScoreError> {
        for indel in indels.iter_mut() {
            self.set_indel_modifiers(indel)?;
        }
        let outcome = resolve_overlap(indels);
        for indel in indels.iter_mut() {
            self.classify_indel(indel)?;
        }
        Ok(outcome)
    }

    /// Adjust a site covered by an indel to the ploidy the indel leaves.
    ///
    /// Ploidy 0 marks the site zero-ploidy and flags covered non-reference
    /// calls; ploidy 1 flags het calls and renders others as haploid.
    pub fn reconcile_site_with_indel(
        &self,
        site: &mut SiteCall,
        indel: &IndelCall,
    ) -> Result<(), ContractError> {
        if site.pos < indel.key.pos || site.pos >= indel.key.end() {
            return Ok(());
        }
        let offset = (site.pos - indel.key.pos) as usize;
        match indel.ploidy(offset)? {
            0 => {
                site.smod.is_zero_ploidy = true;
                if site.smod.is_covered && site.is_nonref() {
                    site.set_filter(VcfFilter::SiteConflict);
                }
            }
            1 => {
                if site.is_het() {
                    site.set_filter(VcfFilter::SiteConflict);
                } else if !site.smod.is_unknown {
                    site.smod.modified_gt = if site.is_nonref() {
                        ModifiedGenotype::One
                    } else {
                        ModifiedGenotype::Zero
                    };
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn apply_site_conflicts(site: &mut SiteCall) {
    let haploid = matches!(
        site.smod.modified_gt,
        ModifiedGenotype::Zero | ModifiedGenotype::One
    );
    if haploid && site.is_het() {
        site.set_filter(VcfFilter::PloidyConflict);
    }
}
