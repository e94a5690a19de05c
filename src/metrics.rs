// ==============================================================================
// metrics.rs - Per-Gene Metric Derivation
// ==============================================================================
// Description: Depth-normalized coverage and non-B-cell contamination level
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;
use crate::models::{CountSummary, DerivedGeneMetric, GeneCountRecord};
use crate::reference::GeneReferenceSets;

/// Scale for RPKM with lengths in base pairs (1e3 bp/kb * 1e6 reads)
pub const RPKM_SCALE: f64 = 1e9;

/// Offset added to every contaminant RPKM so zero-expression genes do not
/// collapse the geometric mean
pub const GEOMEAN_OFFSET: f64 = 1.0;

/// Normalized metrics for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Assigned + Unassigned_NoFeatures reads
    pub total_verified_reads: u64,

    /// One entry per input gene, input order preserved
    pub genes: Vec<DerivedGeneMetric>,

    /// Geometric mean of (RPKM + 1) over contaminant genes, 2 decimals
    pub contaminant_geomean: f64,
}

/// Derive per-gene coverage metrics and the contaminant geometric mean
///
/// # Errors
/// * `ZeroReads` - the summary holds no verified reads
/// * `EmptyGroup` - none of the contaminant genes appear in `records`
pub fn derive_metrics(
    records: &[GeneCountRecord],
    summary: &CountSummary,
    references: &GeneReferenceSets,
) -> Result<DerivedMetrics, AnalysisError> {
    let total_verified_reads = summary.total_verified_reads();
    if total_verified_reads == 0 {
        return Err(AnalysisError::ZeroReads);
    }

    let genes: Vec<DerivedGeneMetric> = records
        .iter()
        .map(|record| derive_gene(record, total_verified_reads))
        .collect();

    let contaminant_geomean = geometric_mean(
        genes
            .iter()
            .filter(|gene| references.is_contaminant(&gene.gene_id))
            .map(|gene| gene.rpkm + GEOMEAN_OFFSET),
    )
    .map(|mean| round_to(mean, 2))
    .ok_or_else(|| AnalysisError::EmptyGroup {
        group: "contaminant".to_string(),
    })?;

    debug!(
        "Derived metrics for {} genes ({} verified reads, contaminant geomean {})",
        genes.len(),
        total_verified_reads,
        contaminant_geomean
    );

    Ok(DerivedMetrics {
        total_verified_reads,
        genes,
        contaminant_geomean,
    })
}

fn derive_gene(record: &GeneCountRecord, total_verified_reads: u64) -> DerivedGeneMetric {
    let count = record.raw_count as f64;
    let length = record.length_bp as f64;

    DerivedGeneMetric {
        gene_id: record.gene_id.clone(),
        raw_count: record.raw_count,
        length_bp: record.length_bp,
        reads_per_bp: count / length,
        rpkm: RPKM_SCALE * count / length / total_verified_reads as f64,
    }
}

/// Geometric mean via the mean of logarithms. `None` for an empty input.
pub fn geometric_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (log_sum, n) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, n), value| (sum + value.ln(), n + 1));

    if n == 0 {
        None
    } else {
        Some((log_sum / n as f64).exp())
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(gene_id: &str, raw_count: u64, length_bp: u64) -> GeneCountRecord {
        GeneCountRecord {
            gene_id: gene_id.to_string(),
            raw_count,
            length_bp,
        }
    }

    fn summary(assigned: u64, no_features: u64) -> CountSummary {
        [
            ("Assigned", assigned),
            ("Unassigned_NoFeatures", no_features),
            ("Unassigned_MultiMapping", 123_456),
        ]
        .into_iter()
        .collect()
    }

    fn references(contaminants: &[&str]) -> GeneReferenceSets {
        GeneReferenceSets {
            contaminant: contaminants.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rpkm_uses_billion_scale() {
        let records = vec![record("ALB", 500, 2_000), record("IGKC", 1_000, 500)];
        let metrics = derive_metrics(&records, &summary(900_000, 100_000), &references(&["ALB"])).unwrap();

        assert_eq!(metrics.total_verified_reads, 1_000_000);
        assert_eq!(metrics.genes.len(), 2);

        // 1e9 * 500 / 2000 / 1e6 = 250
        assert!((metrics.genes[0].rpkm - 250.0).abs() < 1e-9);
        assert!((metrics.genes[0].reads_per_bp - 0.25).abs() < 1e-12);
        // 1e9 * 1000 / 500 / 1e6 = 2000
        assert!((metrics.genes[1].rpkm - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_contaminant_geomean_offsets_zero_counts() {
        // RPKMs 0 and 8 -> geomean(1, 9) = 3
        let records = vec![
            record("ALB", 0, 1_000),
            record("HBB", 8, 1_000),
            record("IGHM", 50, 1_000),
        ];
        let metrics = derive_metrics(&records, &summary(1_000_000, 0), &references(&["ALB", "HBB"])).unwrap();

        assert_eq!(metrics.contaminant_geomean, 3.0);
    }

    #[test]
    fn test_contaminant_geomean_rounded_to_two_decimals() {
        // RPKMs 1 and 2 -> geomean(2, 3) = sqrt(6) = 2.449...
        let records = vec![record("ALB", 1, 1_000), record("HBB", 2, 1_000)];
        let metrics = derive_metrics(&records, &summary(1_000_000, 0), &references(&["ALB", "HBB"])).unwrap();

        assert_eq!(metrics.contaminant_geomean, 2.45);
    }

    #[test]
    fn test_zero_verified_reads() {
        let records = vec![record("ALB", 10, 100)];
        let err = derive_metrics(&records, &summary(0, 0), &references(&["ALB"])).unwrap_err();
        assert_eq!(err, AnalysisError::ZeroReads);
    }

    #[test]
    fn test_no_contaminant_in_table() {
        let records = vec![record("IGHM", 10, 100)];
        let err = derive_metrics(&records, &summary(1_000, 0), &references(&["ALB", "HBB"])).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::EmptyGroup {
                group: "contaminant".to_string()
            }
        );
    }

    #[test]
    fn test_rpkm_finite_and_non_negative() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("G{}", i), i * 37, 1 + i * 11))
            .chain(std::iter::once(record("ALB", 0, 1)))
            .collect();
        let metrics = derive_metrics(&records, &summary(1, 0), &references(&["ALB"])).unwrap();

        for gene in &metrics.genes {
            assert!(gene.rpkm.is_finite());
            assert!(gene.rpkm >= 0.0);
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let records = vec![record("ALB", 3, 700), record("IGHG1", 9_999, 1_234)];
        let sum = summary(12_345, 678);
        let refs = references(&["ALB"]);

        let first = derive_metrics(&records, &sum, &refs).unwrap();
        let second = derive_metrics(&records, &sum, &refs).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_geometric_mean_empty() {
        assert_eq!(geometric_mean(std::iter::empty()), None);
        assert!((geometric_mean([4.0, 16.0]).unwrap() - 8.0).abs() < 1e-12);
    }
}
