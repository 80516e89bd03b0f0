mod common;

use common::{assert_snapshot, called_site, het_site, indel, read, ref_site, rule_params};
use varscore::calls::{Digt, IndelGenotype, IndelKey};
use varscore::{CallStream, InMemoryReads, IndelCall, ModelRegistry, PhasingOptions, SiteCall};

fn site_line(site: &SiteCall) -> String {
    format!(
        "{}:{}\t{}\t{}\t{}\t{}\n",
        site.chrom,
        site.pos,
        site.genotype().expect("valid genotype"),
        site.smod.shared.filters,
        site.qscore.map_or_else(|| ".".to_string(), |q| q.to_string()),
        if site.phased_alt.is_empty() { "." } else { site.phased_alt.as_str() },
    )
}

fn indel_line(indel: &IndelCall) -> String {
    format!(
        "{}:{}\t{}\t{}\t{}\t.\n",
        indel.chrom,
        indel.pos,
        indel.genotype().expect("valid genotype"),
        indel.imod.shared.filters,
        indel.qscore.map_or_else(|| ".".to_string(), |q| q.to_string()),
    )
}

#[test]
fn rule_model_stream_matches_golden() {
    let mut registry = ModelRegistry::default();
    registry
        .load_models_from_str(&rule_params(20))
        .expect("parameter file loads");
    registry.set_model("rules").expect("model exists");

    let mut reads = InMemoryReads::default();
    for _ in 0..12 {
        reads.push(read(95, b"GGGGGACGGG", 60, 30));
    }
    for _ in 0..8 {
        reads.push(read(95, b"GGGGGATGGG", 60, 30));
    }

    let mut stream = CallStream::new(&registry, PhasingOptions::default());
    let sites = [
        ref_site(90),
        called_site(92, b'A', Digt::AC, 15),
        ref_site(96),
        het_site(100),
        called_site(101, b'A', Digt::CT, 40),
        ref_site(102),
        ref_site(110),
    ];

    let mut actual = String::new();
    for site in sites {
        for ready in stream.push_site(site, &mut reads).expect("site processed") {
            actual.push_str(&site_line(&ready));
        }
    }
    for ready in stream.finish(&mut reads).expect("stream finished") {
        actual.push_str(&site_line(&ready));
    }

    let groups = vec![
        vec![
            indel(200, IndelKey::deletion(200, 3), IndelGenotype::Het, 40),
            indel(201, IndelKey::deletion(201, 4), IndelGenotype::Het, 25),
        ],
        vec![indel(300, IndelKey::deletion(300, 2), IndelGenotype::Hom, 10)],
    ];
    for group in groups {
        for classified in stream.push_indels(group).expect("indels classified") {
            actual.push_str(&indel_line(&classified));
        }
    }

    assert_eq!(stream.counts(), (7, 3));
    assert_snapshot("streams/rule_model.tsv", &actual);
}
