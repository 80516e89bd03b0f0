use crate::calls::{CallRecord, FeatureMap, VcfFilter};
use crate::config::GvcfOptions;

/// Quality test for one call: raise `filter` when `score < cutoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    /// Score being tested.
    pub score: i32,
    /// Minimum passing score.
    pub cutoff: i32,
    /// Filter raised on failure.
    pub filter: VcfFilter,
}

/// Hard cutoffs applied next to the quality gate. `None` disables a check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardFilterCutoffs {
    /// Maximum total depth.
    pub max_depth: Option<f64>,
    /// Maximum fraction of filtered basecalls.
    pub max_base_filt: Option<f64>,
    /// Maximum SNV strand bias.
    pub max_snv_sb: Option<f64>,
    /// Maximum homopolymer length around an SNV.
    pub max_snv_hpol: Option<u32>,
    /// Maximum reference repeat count for short-unit repeats.
    pub max_ref_rep: Option<u32>,
}

impl HardFilterCutoffs {
    /// Legacy thresholds from the gVCF options. `chrom_depth` is the
    /// chromosome's average depth when a depth table is loaded.
    pub fn from_options(options: &GvcfOptions, chrom_depth: Option<f64>) -> Self {
        Self {
            max_depth: options
                .max_depth_factor
                .zip(chrom_depth)
                .map(|(factor, depth)| factor * depth),
            max_base_filt: options.max_base_filt,
            max_snv_sb: options.max_snv_sb,
            max_snv_hpol: options.max_snv_hpol,
            max_ref_rep: options.max_ref_rep,
        }
    }

    /// Cutoffs stored in a rule model's cutoff table. Non-positive values
    /// disable the check, and the depth factor needs a known chromosome depth.
    pub fn from_cutoff_table(cutoffs: &FeatureMap, chrom_depth: Option<f64>) -> Self {
        let enabled = |name: &str| cutoffs.get(name).copied().filter(|value| *value > 0.0);
        Self {
            max_depth: enabled("DP")
                .zip(chrom_depth)
                .map(|(factor, depth)| factor * depth),
            max_base_filt: enabled("DPFratio"),
            max_snv_sb: enabled("HighSNVSB"),
            max_snv_hpol: enabled("HighSNVHPOL").map(|value| value as u32),
            max_ref_rep: enabled("HighREFREP").map(|value| value as u32),
        }
    }
}

/// Apply the quality gate and hard cutoffs to a call.
///
/// This is the single filtering routine shared by the legacy path and both
/// model types; they differ only in where the gate and cutoffs come from.
pub fn apply_filters<C: CallRecord + ?Sized>(
    call: &mut C,
    gate: Option<QualityGate>,
    cutoffs: &HardFilterCutoffs,
) {
    if let Some(gate) = gate {
        if gate.score < gate.cutoff {
            call.set_filter(gate.filter);
        }
    }

    let metrics = call.filter_metrics();

    if let Some(max_depth) = cutoffs.max_depth {
        if f64::from(metrics.depth) > max_depth {
            call.set_filter(VcfFilter::HighDepth);
        }
    }

    if let (Some(max_frac), Some(unused)) = (cutoffs.max_base_filt, metrics.unused_basecalls) {
        if metrics.depth > 0 && f64::from(unused) / f64::from(metrics.depth) > max_frac {
            call.set_filter(VcfFilter::HighBaseFilt);
        }
    }

    if let Some((strand_bias, hpol)) = metrics.snv {
        if cutoffs.max_snv_sb.is_some_and(|max| strand_bias > max) {
            call.set_filter(VcfFilter::HighSnvSb);
        }
        if cutoffs.max_snv_hpol.is_some_and(|max| hpol > max) {
            call.set_filter(VcfFilter::HighSnvHpol);
        }
    }

    if let (Some(max_rep), Some((unit_len, ref_count))) = (cutoffs.max_ref_rep, metrics.ref_repeat)
    {
        if unit_len <= 2 && ref_count > max_rep {
            call.set_filter(VcfFilter::HighRefRep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{IndelCall, SiteCall};

    #[test]
    fn gate_fails_strictly_below_cutoff() {
        let mut site = SiteCall::default();
        let gate = QualityGate {
            score: 20,
            cutoff: 20,
            filter: VcfFilter::LowGqx,
        };
        apply_filters(&mut site, Some(gate), &HardFilterCutoffs::default());
        assert!(site.filters().is_empty());

        let gate = QualityGate { score: 19, ..gate };
        apply_filters(&mut site, Some(gate), &HardFilterCutoffs::default());
        assert!(site.filters().contains(VcfFilter::LowGqx));
    }

    #[test]
    fn site_hard_filters() {
        let mut site = SiteCall::default();
        site.n_used_calls = 50;
        site.n_unused_calls = 50;
        site.dgt.is_snp = true;
        site.dgt.sb = 12.0;
        site.hpol = 7;

        let cutoffs = HardFilterCutoffs::from_options(&GvcfOptions::default(), Some(30.0));
        apply_filters(&mut site, None, &cutoffs);

        assert!(site.filters().contains(VcfFilter::HighDepth));
        assert!(site.filters().contains(VcfFilter::HighBaseFilt));
        assert!(site.filters().contains(VcfFilter::HighSnvSb));
        assert!(site.filters().contains(VcfFilter::HighSnvHpol));
    }

    #[test]
    fn depth_filter_needs_chromosome_depth() {
        let mut site = SiteCall::default();
        site.n_used_calls = 500;
        let cutoffs = HardFilterCutoffs::from_options(&GvcfOptions::default(), None);
        apply_filters(&mut site, None, &cutoffs);
        assert!(!site.filters().contains(VcfFilter::HighDepth));
    }

    #[test]
    fn ref_repeat_filter_only_for_short_units() {
        let mut indel = IndelCall::default();
        indel.iri.is_repeat_unit = true;
        indel.iri.repeat_unit = "AC".into();
        indel.iri.ref_repeat_count = 9;
        let mut cutoffs = FeatureMap::new();
        cutoffs.insert("HighREFREP".into(), 8.0);
        cutoffs.insert("DP".into(), 0.0);
        let cutoffs = HardFilterCutoffs::from_cutoff_table(&cutoffs, Some(30.0));
        assert_eq!(cutoffs.max_depth, None);

        apply_filters(&mut indel, None, &cutoffs);
        assert!(indel.filters().contains(VcfFilter::HighRefRep));

        let mut long_unit = IndelCall::default();
        long_unit.iri.is_repeat_unit = true;
        long_unit.iri.repeat_unit = "ACG".into();
        long_unit.iri.ref_repeat_count = 20;
        apply_filters(&mut long_unit, None, &cutoffs);
        assert!(long_unit.filters().is_empty());
    }
}
