// ==============================================================================
// test_fixtures.rs - Shared Test Data
// ==============================================================================
// Description: Synthetic monoclonal sample used across module tests
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Subtype layout (all lengths 1000 bp, 100,000 verified reads):
//   IGHC: IGHA1 110, IGHG1 880, IGHM 10        -> IGHG1 = 0.88
//   IGHV: IGHV1-2 900, IGHV3-23 100            -> IGHV1-2 = 0.90
//   IGKC: IGKC 950 | IGLC: IGLC1 30, IGLC2 20  -> IGKC = 0.95 of light constant
//   IGKV: IGKV1-5 920, IGKV3-20 40 | IGLV: IGLV2-14 40
//   Loci: HEAVY 5000, KAPPA 3000, LAMBDA 1000; contaminant ALB 100
// ==============================================================================

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ReferenceFiles;
use crate::models::{CountSummary, GeneCountRecord};
use crate::reference::GeneReferenceSets;

pub const SAMPLE_GENES: [(&str, u64); 15] = [
    ("ALB", 100),
    ("IGHA1", 110),
    ("IGHG1", 880),
    ("IGHM", 10),
    ("IGHV1-2", 900),
    ("IGHV3-23", 100),
    ("IGKC", 950),
    ("IGKV1-5", 920),
    ("IGKV3-20", 40),
    ("IGLC1", 30),
    ("IGLC2", 20),
    ("IGLV2-14", 40),
    ("HEAVY_Locus", 5000),
    ("KAPPA_Locus", 3000),
    ("LAMBDA_Locus", 1000),
];

pub fn records_from(genes: &[(&str, u64)]) -> Vec<GeneCountRecord> {
    genes
        .iter()
        .map(|(gene_id, raw_count)| GeneCountRecord {
            gene_id: gene_id.to_string(),
            raw_count: *raw_count,
            length_bp: 1000,
        })
        .collect()
}

pub fn sample_records() -> Vec<GeneCountRecord> {
    records_from(&SAMPLE_GENES)
}

pub fn sample_summary() -> CountSummary {
    [
        ("Assigned", 90_000),
        ("Unassigned_NoFeatures", 10_000),
        ("Unassigned_MultiMapping", 4_321),
    ]
    .into_iter()
    .collect()
}

const LISTS: [(&str, &[&str]); 7] = [
    ("contaminant", &["ALB", "HBB"]),
    ("IGHV", &["IGHV1-2", "IGHV3-23"]),
    ("IGHC", &["IGHM", "IGHG1", "IGHA1"]),
    ("IGKV", &["IGKV1-5", "IGKV3-20"]),
    ("IGKC", &["IGKC"]),
    ("IGLV", &["IGLV2-14"]),
    ("IGLC", &["IGLC1", "IGLC2"]),
];

fn list(name: &str) -> &'static [&'static str] {
    LISTS
        .iter()
        .find(|(list_name, _)| *list_name == name)
        .map(|(_, genes)| *genes)
        .unwrap()
}

pub fn reference_sets() -> GeneReferenceSets {
    let set = |name: &str| -> HashSet<String> { list(name).iter().map(|g| g.to_string()).collect() };
    GeneReferenceSets {
        contaminant: set("contaminant"),
        heavy_variable: set("IGHV"),
        heavy_constant: set("IGHC"),
        kappa_variable: set("IGKV"),
        kappa_constant: set("IGKC"),
        lambda_variable: set("IGLV"),
        lambda_constant: set("IGLC"),
    }
}

/// Write the seven gene lists under their default file names
pub fn write_resource_dir(dir: &Path) {
    let files = ReferenceFiles::default();
    for (name, file) in [
        ("contaminant", &files.contaminant),
        ("IGHV", &files.heavy_variable),
        ("IGHC", &files.heavy_constant),
        ("IGKV", &files.kappa_variable),
        ("IGKC", &files.kappa_constant),
        ("IGLV", &files.lambda_variable),
        ("IGLC", &files.lambda_constant),
    ] {
        fs::write(dir.join(file), list(name).join("\n") + "\n").unwrap();
    }
}

/// Write a featureCounts table and summary for `genes`; returns the table path
pub fn write_featurecounts(dir: &Path, sample: &str, genes: &[(&str, u64)]) -> PathBuf {
    let counts_path = dir.join(format!("{}.txt", sample));
    let mut counts = String::from(
        "# Program:featureCounts v2.0.1; Command:\"featureCounts\" \"-g\" \"gene_name\"\n\
         Geneid\tChr\tStart\tEnd\tStrand\tLength\t/data/sample.bam\n",
    );
    for (gene_id, count) in genes {
        counts.push_str(&format!("{}\tchr14\t1\t1000\t-\t1000\t{}\n", gene_id, count));
    }
    fs::write(&counts_path, counts).unwrap();

    let summary = "Status\t/data/sample.bam\n\
                   Assigned\t90000\n\
                   Unassigned_Unmapped\t0\n\
                   Unassigned_MultiMapping\t4321\n\
                   Unassigned_NoFeatures\t10000\n";
    fs::write(dir.join(format!("{}.txt.summary", sample)), summary).unwrap();

    counts_path
}
