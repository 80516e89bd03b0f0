#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use varscore::calls::{Digt, IndelGenotype, IndelKey};
use varscore::{AlignedRead, IndelCall, SiteCall, VariantCase, VariantType, Zygosity};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("VARSCORE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set VARSCORE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Called, covered site with the given genotype and GQX.
pub fn called_site(pos: u32, reference: u8, gt: Digt, gqx: i32) -> SiteCall {
    let mut site = SiteCall::new("chr1", pos, reference, [10, 10, 0, 0]);
    site.smod.is_unknown = false;
    site.smod.is_covered = true;
    site.smod.is_used_covered = true;
    site.smod.shared.max_gt = gt.index();
    site.smod.shared.gq = gqx;
    site.smod.shared.gqx = gqx;
    site.dgt.is_snp = gt != Digt::homozygous(reference).unwrap_or(Digt::AA);
    site.n_used_calls = 20;
    site
}

/// Het SNV with reference `A`.
pub fn het_site(pos: u32) -> SiteCall {
    called_site(pos, b'A', Digt::AC, 40)
}

/// Hom-ref site with reference `A`.
pub fn ref_site(pos: u32) -> SiteCall {
    called_site(pos, b'A', Digt::AA, 40)
}

/// Indel whose modifiers are already set, at `pos` with the given shape.
pub fn indel(pos: u32, key: IndelKey, gt: IndelGenotype, gqx: i32) -> IndelCall {
    let mut indel = IndelCall::default();
    indel.chrom = "chr1".into();
    indel.pos = pos;
    indel.key = key;
    indel.dindel.max_gt = gt.index();
    indel.dindel.max_gt_qphred = gqx;
    indel.dindel.indel_qphred = gqx;
    indel.imod.shared.max_gt = gt.index();
    indel.imod.shared.gq = gqx;
    indel.imod.shared.gqx = gqx;
    indel.isri.depth = 25;
    indel
}

/// A call of either kind that falls in the requested variant case.
#[derive(Debug, Clone)]
pub enum CaseCall {
    Site(SiteCall),
    Indel(IndelCall),
}

pub fn call_for_case(case: VariantCase, gqx: i32) -> CaseCall {
    match case.variant_type() {
        VariantType::Snp => {
            let gt = match case.zygosity() {
                Zygosity::Het => Digt::AC,
                Zygosity::Hom => Digt::CC,
                Zygosity::HetAlt => Digt::CG,
            };
            CaseCall::Site(called_site(100, b'A', gt, gqx))
        }
        kind => {
            let key = if kind == VariantType::Insertion {
                IndelKey::insertion(100, "TTT")
            } else {
                IndelKey::deletion(100, 3)
            };
            let gt = if case.zygosity() == Zygosity::Hom {
                IndelGenotype::Hom
            } else {
                IndelGenotype::Het
            };
            let mut call = indel(100, key, gt, gqx);
            call.imod.is_overlap = case.zygosity() == Zygosity::HetAlt;
            CaseCall::Indel(call)
        }
    }
}

/// Parameter file with one rule model `rules` giving every case cutoff `q`.
pub fn rule_params(q: i32) -> String {
    let cases: Vec<String> = VariantCase::ALL
        .iter()
        .map(|case| format!(r#""{}": {{"Cutoff": {{"Q": {q}}}}}"#, case.label()))
        .collect();
    format!(r#"{{"rules": {{"Type": "RULE", "Model": {{{}}}}}}}"#, cases.join(","))
}

/// Parameter file with one logistic model `logit` covering every case.
pub fn logistic_params() -> String {
    let cases: Vec<String> = VariantCase::ALL
        .iter()
        .map(|case| {
            format!(
                r#""{}": {{
                    "Cutoff": {{"Q": 15}},
                    "PopMean": {{"GQX": 30, "MQ": 50}},
                    "PopStd": {{"GQX": 12, "MQ": 10}},
                    "Coefs": {{"Intercept": 1.25, "GQX": 1.5, "MQ": 0.5, "GQX:MQ": -0.2, "DP_NORM": 0.3}}
                }}"#,
                case.label()
            )
        })
        .collect();
    format!(r#"{{"logit": {{"Type": "LOGISTIC", "Model": {{{}}}}}}}"#, cases.join(","))
}

/// Ungapped read with uniform quality.
pub fn read(pos: u32, seq: &[u8], mapq: u8, baseq: u8) -> AlignedRead {
    AlignedRead::new("chr1", pos, mapq, Vec::new(), seq.to_vec(), vec![baseq; seq.len()], false)
}
