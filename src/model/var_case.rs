use std::fmt;

use crate::calls::{IndelCall, IndelGenotype, SiteCall, VcfFilter};

/// Zygosity component of a variant case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zygosity {
    /// One reference and one alternate allele.
    Het,
    /// Two copies of the same alternate allele.
    Hom,
    /// Two different alternate alleles.
    HetAlt,
}

/// Variant type component of a variant case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantType {
    /// Single-base substitution.
    Snp,
    /// Net insertion.
    Insertion,
    /// Net deletion.
    Deletion,
}

/// One of the nine zygosity × variant-type buckets every model is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantCase {
    /// Heterozygous SNP.
    HetSnp,
    /// Homozygous SNP.
    HomSnp,
    /// Het-alt SNP.
    HetAltSnp,
    /// Heterozygous insertion.
    HetIns,
    /// Homozygous insertion.
    HomIns,
    /// Het-alt insertion.
    HetAltIns,
    /// Heterozygous deletion.
    HetDel,
    /// Homozygous deletion.
    HomDel,
    /// Het-alt deletion.
    HetAltDel,
}

impl VariantCase {
    /// All cases in parameter-file order.
    pub const ALL: [VariantCase; 9] = [
        VariantCase::HetSnp,
        VariantCase::HomSnp,
        VariantCase::HetAltSnp,
        VariantCase::HetIns,
        VariantCase::HomIns,
        VariantCase::HetAltIns,
        VariantCase::HetDel,
        VariantCase::HomDel,
        VariantCase::HetAltDel,
    ];

    /// Compose a case from its two components.
    pub fn new(zygosity: Zygosity, variant_type: VariantType) -> Self {
        use VariantCase::*;
        match (variant_type, zygosity) {
            (VariantType::Snp, Zygosity::Het) => HetSnp,
            (VariantType::Snp, Zygosity::Hom) => HomSnp,
            (VariantType::Snp, Zygosity::HetAlt) => HetAltSnp,
            (VariantType::Insertion, Zygosity::Het) => HetIns,
            (VariantType::Insertion, Zygosity::Hom) => HomIns,
            (VariantType::Insertion, Zygosity::HetAlt) => HetAltIns,
            (VariantType::Deletion, Zygosity::Het) => HetDel,
            (VariantType::Deletion, Zygosity::Hom) => HomDel,
            (VariantType::Deletion, Zygosity::HetAlt) => HetAltDel,
        }
    }

    /// Zygosity component.
    pub fn zygosity(self) -> Zygosity {
        use VariantCase::*;
        match self {
            HetSnp | HetIns | HetDel => Zygosity::Het,
            HomSnp | HomIns | HomDel => Zygosity::Hom,
            HetAltSnp | HetAltIns | HetAltDel => Zygosity::HetAlt,
        }
    }

    /// Variant type component.
    pub fn variant_type(self) -> VariantType {
        use VariantCase::*;
        match self {
            HetSnp | HomSnp | HetAltSnp => VariantType::Snp,
            HetIns | HomIns | HetAltIns => VariantType::Insertion,
            HetDel | HomDel | HetAltDel => VariantType::Deletion,
        }
    }

    /// Label used in parameter files.
    pub fn label(self) -> &'static str {
        use VariantCase::*;
        match self {
            HetSnp => "snphet",
            HomSnp => "snphom",
            HetAltSnp => "snphetalt",
            HetIns => "inshet",
            HomIns => "inshom",
            HetAltIns => "inshetalt",
            HetDel => "delhet",
            HomDel => "delhom",
            HetAltDel => "delhetalt",
        }
    }

    /// Human-readable name for VCF header descriptions.
    pub fn description(self) -> &'static str {
        use VariantCase::*;
        match self {
            HetSnp => "het SNP",
            HomSnp => "hom SNP",
            HetAltSnp => "het-alt SNP",
            HetIns => "het insertion",
            HomIns => "hom insertion",
            HetAltIns => "het-alt insertion",
            HetDel => "het deletion",
            HomDel => "hom deletion",
            HetAltDel => "het-alt deletion",
        }
    }

    /// Parse a parameter-file label.
    pub fn from_label(label: &str) -> Option<Self> {
        VariantCase::ALL
            .into_iter()
            .find(|case| case.label() == label)
    }

    /// Low-quality filter raised for this case.
    pub fn qscore_filter(self) -> VcfFilter {
        use VariantCase::*;
        match self {
            HetSnp => VcfFilter::LowQscoreHetSnp,
            HomSnp => VcfFilter::LowQscoreHomSnp,
            HetAltSnp => VcfFilter::LowQscoreHetAltSnp,
            HetIns => VcfFilter::LowQscoreHetIns,
            HomIns => VcfFilter::LowQscoreHomIns,
            HetAltIns => VcfFilter::LowQscoreHetAltIns,
            HetDel => VcfFilter::LowQscoreHetDel,
            HomDel => VcfFilter::LowQscoreHomDel,
            HetAltDel => VcfFilter::LowQscoreHetAltDel,
        }
    }

    /// Case of a site call; `None` unless the site is a called, non-reference SNV.
    pub fn for_site(site: &SiteCall) -> Option<Self> {
        if !site.dgt.is_snp || !site.is_qual() {
            return None;
        }
        let gt = site.max_genotype().ok()?;
        let zygosity = if site.is_hetalt() {
            Zygosity::HetAlt
        } else if gt.is_het() {
            Zygosity::Het
        } else {
            Zygosity::Hom
        };
        Some(VariantCase::new(zygosity, VariantType::Snp))
    }

    /// Case of an indel call; `None` for reference calls.
    pub fn for_indel(indel: &IndelCall) -> Option<Self> {
        let zygosity = if indel.is_hetalt() {
            Zygosity::HetAlt
        } else {
            match indel.max_genotype().ok()? {
                IndelGenotype::Het => Zygosity::Het,
                IndelGenotype::Hom => Zygosity::Hom,
                IndelGenotype::NoIndel => return None,
            }
        };
        let variant_type = if indel.key.is_insertion() {
            VariantType::Insertion
        } else {
            VariantType::Deletion
        };
        Some(VariantCase::new(zygosity, variant_type))
    }
}

impl fmt::Display for VariantCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{Digt, IndelKey};

    #[test]
    fn labels_round_trip_and_cases_are_distinct() {
        for case in VariantCase::ALL {
            assert_eq!(VariantCase::from_label(case.label()), Some(case));
            assert_eq!(VariantCase::new(case.zygosity(), case.variant_type()), case);
        }
        assert_eq!(VariantCase::from_label("snp"), None);
    }

    #[test]
    fn site_case_uses_zygosity() {
        let mut site = SiteCall::new("chr1", 5, b'A', [10, 10, 0, 0]);
        site.dgt.is_snp = true;
        site.smod.is_unknown = false;
        site.smod.is_used_covered = true;
        site.smod.shared.max_gt = Digt::AC.index();
        assert_eq!(VariantCase::for_site(&site), Some(VariantCase::HetSnp));

        site.smod.shared.max_gt = Digt::CC.index();
        assert_eq!(VariantCase::for_site(&site), Some(VariantCase::HomSnp));

        site.smod.shared.max_gt = Digt::CG.index();
        assert_eq!(VariantCase::for_site(&site), Some(VariantCase::HetAltSnp));

        site.smod.shared.max_gt = Digt::AA.index();
        assert_eq!(VariantCase::for_site(&site), None);
    }

    #[test]
    fn indel_case_uses_key_and_overlap() {
        let mut indel = IndelCall::default();
        indel.key = IndelKey::insertion(3, "TT");
        indel.imod.shared.max_gt = IndelGenotype::Het.index();
        assert_eq!(VariantCase::for_indel(&indel), Some(VariantCase::HetIns));

        indel.key = IndelKey::deletion(3, 2);
        indel.imod.shared.max_gt = IndelGenotype::Hom.index();
        assert_eq!(VariantCase::for_indel(&indel), Some(VariantCase::HomDel));

        indel.imod.is_overlap = true;
        assert_eq!(VariantCase::for_indel(&indel), Some(VariantCase::HetAltDel));

        indel.imod.is_overlap = false;
        indel.imod.shared.max_gt = IndelGenotype::NoIndel.index();
        assert_eq!(VariantCase::for_indel(&indel), None);
    }
}
