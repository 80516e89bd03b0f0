//! Genotype enumerations for single-base sites and indels.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ContractError;

/// Number of called base states (A, C, G, T).
pub const N_BASE: usize = 4;

/// Base symbols in index order.
pub const BASES: [u8; N_BASE] = *b"ACGT";

/// Index of a base within [`BASES`], `None` for ambiguous symbols.
pub fn base_index(base: u8) -> Option<usize> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

/// The ten unphased diploid genotypes over {A, C, G, T}.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digt {
    AA,
    CC,
    GG,
    TT,
    AC,
    AG,
    AT,
    CG,
    CT,
    GT,
}

impl Digt {
    /// Number of diploid genotypes.
    pub const SIZE: usize = 10;

    /// Genotypes in index order.
    pub const ALL: [Digt; Digt::SIZE] = [
        Digt::AA,
        Digt::CC,
        Digt::GG,
        Digt::TT,
        Digt::AC,
        Digt::AG,
        Digt::AT,
        Digt::CG,
        Digt::CT,
        Digt::GT,
    ];

    /// Decode a stored genotype index.
    pub fn from_index(index: usize) -> Result<Self, ContractError> {
        Digt::ALL
            .get(index)
            .copied()
            .ok_or(ContractError::SiteGenotypeIndex { index })
    }

    /// Position in [`Digt::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Homozygous genotype for a reference base, `None` for ambiguous bases.
    pub fn homozygous(base: u8) -> Option<Self> {
        base_index(base).map(|idx| Digt::ALL[idx])
    }

    /// The two allele symbols of the genotype.
    pub fn alleles(self) -> [u8; 2] {
        match self {
            Digt::AA => *b"AA",
            Digt::CC => *b"CC",
            Digt::GG => *b"GG",
            Digt::TT => *b"TT",
            Digt::AC => *b"AC",
            Digt::AG => *b"AG",
            Digt::AT => *b"AT",
            Digt::CG => *b"CG",
            Digt::CT => *b"CT",
            Digt::GT => *b"GT",
        }
    }

    /// Whether the two alleles differ.
    pub fn is_het(self) -> bool {
        let [a, b] = self.alleles();
        a != b
    }

    /// Whether `base` is one of the genotype's alleles.
    pub fn contains(self, base: u8) -> bool {
        let base = base.to_ascii_uppercase();
        self.alleles().contains(&base)
    }

    /// VCF `GT` text of this genotype relative to a reference genotype.
    pub fn vcf_label(self, reference: Digt) -> &'static str {
        let ref_base = reference.alleles()[0];
        let [a, b] = self.alleles();
        match (a == ref_base, b == ref_base) {
            (true, true) => "0/0",
            (true, false) | (false, true) => "0/1",
            (false, false) if a == b => "1/1",
            (false, false) => "1/2",
        }
    }
}

impl fmt::Display for Digt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.alleles();
        write!(f, "{}{}", a as char, b as char)
    }
}

/// Diploid indel genotype states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndelGenotype {
    /// Reference on both haplotypes.
    NoIndel,
    /// Indel on both haplotypes.
    Hom,
    /// Indel on one haplotype.
    Het,
}

impl IndelGenotype {
    /// Number of diploid indel genotypes.
    pub const SIZE: usize = 3;

    const ALL: [IndelGenotype; IndelGenotype::SIZE] =
        [IndelGenotype::NoIndel, IndelGenotype::Hom, IndelGenotype::Het];

    /// Decode a stored genotype index.
    pub fn from_index(index: usize) -> Result<Self, ContractError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ContractError::IndelGenotypeIndex {
                index,
                haploid: false,
            })
    }

    /// Position in the genotype enumeration.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Diploid VCF `GT` text.
    pub fn label(self) -> &'static str {
        match self {
            IndelGenotype::NoIndel => "0/0",
            IndelGenotype::Hom => "1/1",
            IndelGenotype::Het => "0/1",
        }
    }

    /// Haploid VCF `GT` text; heterozygosity is not representable.
    pub fn haploid_label(self) -> Result<&'static str, ContractError> {
        match self {
            IndelGenotype::NoIndel => Ok("0"),
            IndelGenotype::Hom => Ok("1"),
            IndelGenotype::Het => Err(ContractError::IndelGenotypeIndex {
                index: self.index(),
                haploid: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcf_labels_follow_reference() {
        assert_eq!(Digt::AA.vcf_label(Digt::AA), "0/0");
        assert_eq!(Digt::AC.vcf_label(Digt::AA), "0/1");
        assert_eq!(Digt::AC.vcf_label(Digt::CC), "0/1");
        assert_eq!(Digt::CC.vcf_label(Digt::AA), "1/1");
        assert_eq!(Digt::AC.vcf_label(Digt::GG), "1/2");
    }

    #[test]
    fn genotype_index_is_validated() {
        assert_eq!(Digt::from_index(4).unwrap(), Digt::AC);
        assert!(Digt::from_index(Digt::SIZE).is_err());
        assert!(IndelGenotype::from_index(3).is_err());
        assert!(IndelGenotype::Het.haploid_label().is_err());
    }

    #[test]
    fn homozygous_lookup_skips_ambiguous_bases() {
        assert_eq!(Digt::homozygous(b'g'), Some(Digt::GG));
        assert_eq!(Digt::homozygous(b'N'), None);
        assert!(Digt::CT.is_het());
        assert!(!Digt::TT.is_het());
    }
}
