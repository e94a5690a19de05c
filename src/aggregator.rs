// ==============================================================================
// aggregator.rs - Ig Locus Aggregation
// ==============================================================================
// Description: Subtype tables, locus totals and primary/secondary rankings
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::error::AnalysisError;
use crate::metrics::DerivedMetrics;
use crate::models::{
    DerivedGeneMetric, IgTableRow, LocusTotals, PrimarySecondary, RankingGroup, Subtype,
    SubtypeTotals, TopSummary,
};
use crate::reference::GeneReferenceSets;

/// Substrings identifying the whole-locus pseudo-gene rows
pub const HEAVY_LOCUS: &str = "HEAVY_Locus";
pub const KAPPA_LOCUS: &str = "KAPPA_Locus";
pub const LAMBDA_LOCUS: &str = "LAMBDA_Locus";

/// Row order of the Heavy table
pub const HEAVY_ORDER: [Subtype; 2] = [Subtype::Ighc, Subtype::Ighv];

/// Row order of the Light table
pub const LIGHT_ORDER: [Subtype; 4] = [Subtype::Igkc, Subtype::Igkv, Subtype::Iglc, Subtype::Iglv];

/// Per-locus aggregates of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusAggregate {
    /// IGHC rows then IGHV rows
    pub heavy: Vec<IgTableRow>,
    /// IGKC, IGKV, IGLC then IGLV rows
    pub light: Vec<IgTableRow>,
    pub subtype_totals: SubtypeTotals,
    pub locus_totals: LocusTotals,
    pub heavy_constant: PrimarySecondary,
    pub heavy_variable: PrimarySecondary,
    pub light_constant: PrimarySecondary,
    pub light_variable: PrimarySecondary,
    pub top: TopSummary,
}

impl LocusAggregate {
    /// Heavy rows followed by Light rows
    pub fn complete(&self) -> impl Iterator<Item = &IgTableRow> {
        self.heavy.iter().chain(self.light.iter())
    }

    pub fn ranking(&self, group: RankingGroup) -> &PrimarySecondary {
        match group {
            RankingGroup::HeavyConstant => &self.heavy_constant,
            RankingGroup::HeavyVariable => &self.heavy_variable,
            RankingGroup::LightConstant => &self.light_constant,
            RankingGroup::LightVariable => &self.light_variable,
        }
    }
}

/// Build subtype tables, locus totals and rankings from derived metrics
///
/// # Errors
/// * `MissingLocusRow` - a locus pseudo-gene row is absent or duplicated
/// * `InsufficientGenes` - a ranking group holds fewer than two genes
pub fn aggregate(
    metrics: &DerivedMetrics,
    references: &GeneReferenceSets,
) -> Result<LocusAggregate, AnalysisError> {
    let total_reads = metrics.total_verified_reads;

    let members: Vec<(Subtype, Vec<&DerivedGeneMetric>)> = Subtype::ALL
        .iter()
        .map(|subtype| {
            let genes = references.genes(*subtype);
            let matched: Vec<&DerivedGeneMetric> = metrics
                .genes
                .iter()
                .filter(|gene| genes.contains(&gene.gene_id))
                .collect();
            (*subtype, matched)
        })
        .collect();

    let mut subtype_totals = SubtypeTotals::default();
    for (subtype, genes) in &members {
        subtype_totals.add(*subtype, genes.iter().map(|g| g.raw_count).sum());
    }

    let locus_totals = LocusTotals::new(
        locus_count(&metrics.genes, HEAVY_LOCUS)?,
        locus_count(&metrics.genes, KAPPA_LOCUS)?,
        locus_count(&metrics.genes, LAMBDA_LOCUS)?,
        &subtype_totals,
        total_reads,
    );

    let rows_of = |subtype: Subtype| -> Vec<IgTableRow> {
        let group_total = subtype_totals.group_total(subtype);
        members
            .iter()
            .filter(|(s, _)| *s == subtype)
            .flat_map(|(_, genes)| genes.iter())
            .map(|gene| IgTableRow {
                common_name: gene.gene_id.clone(),
                count: gene.raw_count,
                percentage: gene.raw_count as f64 / group_total as f64,
                total_frequency: gene.raw_count as f64 / total_reads as f64,
                locus: subtype,
                element_size: gene.length_bp,
            })
            .collect()
    };

    let heavy: Vec<IgTableRow> = HEAVY_ORDER.iter().flat_map(|s| rows_of(*s)).collect();
    let light: Vec<IgTableRow> = LIGHT_ORDER.iter().flat_map(|s| rows_of(*s)).collect();

    let rank = |group: RankingGroup| {
        let rows: Vec<&IgTableRow> = heavy
            .iter()
            .chain(light.iter())
            .filter(|row| group.members().contains(&row.locus))
            .collect();
        primary_secondary(group, rows)
    };

    let heavy_constant = rank(RankingGroup::HeavyConstant)?;
    let heavy_variable = rank(RankingGroup::HeavyVariable)?;
    let light_constant = rank(RankingGroup::LightConstant)?;
    let light_variable = rank(RankingGroup::LightVariable)?;

    let top = top_summary([
        &heavy_constant,
        &heavy_variable,
        &light_constant,
        &light_variable,
    ]);

    debug!(
        "Aggregated {} heavy and {} light rows (Top1 {:.4}, Top2 {:.4})",
        heavy.len(),
        light.len(),
        top.top1,
        top.top2
    );

    Ok(LocusAggregate {
        heavy,
        light,
        subtype_totals,
        locus_totals,
        heavy_constant,
        heavy_variable,
        light_constant,
        light_variable,
        top,
    })
}

/// Read count of the single row whose id contains `marker`
fn locus_count(genes: &[DerivedGeneMetric], marker: &str) -> Result<u64, AnalysisError> {
    let matches: Vec<&DerivedGeneMetric> = genes
        .iter()
        .filter(|gene| gene.gene_id.contains(marker))
        .collect();

    match matches.as_slice() {
        [row] => Ok(row.raw_count),
        _ => Err(AnalysisError::MissingLocusRow {
            locus: marker.to_string(),
            found: matches.len(),
        }),
    }
}

/// Top two rows by read count. Equal counts keep first-seen order.
fn primary_secondary(
    group: RankingGroup,
    mut rows: Vec<&IgTableRow>,
) -> Result<PrimarySecondary, AnalysisError> {
    if rows.len() < 2 {
        return Err(AnalysisError::InsufficientGenes {
            group: group.as_str().to_string(),
            found: rows.len(),
        });
    }

    rows.sort_by(|a, b| b.count.cmp(&a.count));
    let (primary, secondary) = (rows[0], rows[1]);

    Ok(PrimarySecondary {
        group,
        primary: primary.common_name.clone(),
        primary_freq: primary.percentage,
        secondary: secondary.common_name.clone(),
        secondary_freq: secondary.percentage,
        delta: primary.percentage - secondary.percentage,
    })
}

fn top_summary(mut groups: [&PrimarySecondary; 4]) -> TopSummary {
    groups.sort_by(|a, b| descending_nan_last(a.primary_freq, b.primary_freq));
    let (first, second) = (groups[0], groups[1]);

    TopSummary {
        top1: first.primary_freq,
        top2: second.primary_freq,
        top1_delta: first.delta,
        top2_delta: second.delta,
        mean_top_delta: (first.delta + second.delta) / 2.0,
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::derive_metrics;
    use crate::test_fixtures::{reference_sets, records_from, sample_records, sample_summary, SAMPLE_GENES};

    const EPS: f64 = 1e-12;

    fn aggregate_genes(genes: &[(&str, u64)]) -> Result<LocusAggregate, AnalysisError> {
        let refs = reference_sets();
        let metrics = derive_metrics(&records_from(genes), &sample_summary(), &refs)?;
        aggregate(&metrics, &refs)
    }

    fn sample_aggregate() -> LocusAggregate {
        let refs = reference_sets();
        let metrics = derive_metrics(&sample_records(), &sample_summary(), &refs).unwrap();
        aggregate(&metrics, &refs).unwrap()
    }

    fn without(gene: &str) -> Vec<(&'static str, u64)> {
        SAMPLE_GENES.iter().copied().filter(|(g, _)| *g != gene).collect()
    }

    #[test]
    fn test_table_order_and_columns() {
        let agg = sample_aggregate();

        let heavy: Vec<_> = agg.heavy.iter().map(|r| r.common_name.as_str()).collect();
        assert_eq!(heavy, ["IGHA1", "IGHG1", "IGHM", "IGHV1-2", "IGHV3-23"]);

        let light: Vec<_> = agg.light.iter().map(|r| r.common_name.as_str()).collect();
        assert_eq!(
            light,
            ["IGKC", "IGKV1-5", "IGKV3-20", "IGLC1", "IGLC2", "IGLV2-14"]
        );

        let ighg1 = &agg.heavy[1];
        assert_eq!(ighg1.count, 880);
        assert_eq!(ighg1.locus, Subtype::Ighc);
        assert_eq!(ighg1.element_size, 1000);
        assert!((ighg1.percentage - 0.88).abs() < EPS);
        assert!((ighg1.total_frequency - 0.0088).abs() < EPS);
        assert_eq!(agg.light[3].locus, Subtype::Iglc);
    }

    #[test]
    fn test_list_percent_sums_to_one_per_group() {
        let agg = sample_aggregate();

        for group in RankingGroup::ALL {
            let sum: f64 = agg
                .complete()
                .filter(|row| group.members().contains(&row.locus))
                .map(|row| row.percentage)
                .sum();
            assert!((sum - 1.0).abs() < 1e-9, "{:?} sums to {}", group, sum);
        }
    }

    #[test]
    fn test_light_chains_share_group_total() {
        let agg = sample_aggregate();

        // IGLC1 30 of 1000 light constant reads, not of 50 lambda constant reads
        let iglc1 = agg.light.iter().find(|r| r.common_name == "IGLC1").unwrap();
        assert!((iglc1.percentage - 0.03).abs() < EPS);
        assert_eq!(agg.subtype_totals.iglc, 50);
        assert_eq!(agg.subtype_totals.light_constant(), 1000);
    }

    #[test]
    fn test_locus_totals() {
        let agg = sample_aggregate();
        let totals = agg.locus_totals;

        assert_eq!(totals.total_igh, 5000);
        assert_eq!(totals.total_igk, 3000);
        assert_eq!(totals.total_igl, 1000);
        assert_eq!(totals.total_ig, 9000);
        assert_eq!(totals.total_light_chain, 4000);
        assert!((totals.percent_ig - 0.09).abs() < EPS);
        assert!((totals.percent_kappa - 0.75).abs() < EPS);
        assert!((totals.percent_lambda - 0.25).abs() < EPS);
    }

    #[test]
    fn test_primary_secondary() {
        let agg = sample_aggregate();

        assert_eq!(agg.heavy_constant.primary, "IGHG1");
        assert_eq!(agg.heavy_constant.secondary, "IGHA1");
        assert!((agg.heavy_constant.delta - 0.77).abs() < 1e-9);

        assert_eq!(agg.heavy_variable.primary, "IGHV1-2");
        assert_eq!(agg.light_constant.primary, "IGKC");
        assert_eq!(agg.light_constant.secondary, "IGLC1");
        assert!((agg.light_constant.delta - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        // IGKV3-20 and IGLV2-14 both have 40 reads; kappa rows come first
        let agg = sample_aggregate();
        assert_eq!(agg.light_variable.primary, "IGKV1-5");
        assert_eq!(agg.light_variable.secondary, "IGKV3-20");
        assert_eq!(agg.ranking(RankingGroup::LightVariable).secondary, "IGKV3-20");
    }

    #[test]
    fn test_top_summary() {
        let top = sample_aggregate().top;

        // Primaries: IGHC 0.88, IGHV 0.90, light C 0.95, light V 0.92
        assert!((top.top1 - 0.95).abs() < EPS);
        assert!((top.top2 - 0.92).abs() < EPS);
        assert!((top.top1_delta - 0.92).abs() < 1e-9);
        assert!((top.top2_delta - 0.88).abs() < 1e-9);
        assert!((top.mean_top_delta - 0.90).abs() < 1e-9);
    }

    #[test]
    fn test_missing_kappa_locus() {
        let err = aggregate_genes(&without("KAPPA_Locus")).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingLocusRow {
                locus: "KAPPA_Locus".to_string(),
                found: 0
            }
        );
    }

    #[test]
    fn test_duplicate_heavy_locus() {
        let mut genes = SAMPLE_GENES.to_vec();
        genes.push(("HEAVY_Locus_alt", 12));

        let err = aggregate_genes(&genes).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MissingLocusRow {
                locus: "HEAVY_Locus".to_string(),
                found: 2
            }
        );
    }

    #[test]
    fn test_insufficient_genes() {
        let genes: Vec<_> = without("IGHV3-23");
        let err = aggregate_genes(&genes).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientGenes {
                group: "IGHV".to_string(),
                found: 1
            }
        );
    }

    #[test]
    fn test_membership_is_verbatim() {
        // A prefix-alike gene absent from the lists is not aggregated
        let mut genes = SAMPLE_GENES.to_vec();
        genes.push(("IGHV1-2D", 5000));

        let agg = aggregate_genes(&genes).unwrap();
        assert!(agg.heavy.iter().all(|r| r.common_name != "IGHV1-2D"));
        assert_eq!(agg.subtype_totals.ighv, 1000);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        assert_eq!(sample_aggregate(), sample_aggregate());
    }

    #[test]
    fn test_nan_primaries_sort_last() {
        let ranked = |freq: f64| PrimarySecondary {
            group: RankingGroup::HeavyConstant,
            primary: "A".to_string(),
            primary_freq: freq,
            secondary: "B".to_string(),
            secondary_freq: 0.0,
            delta: freq,
        };
        let (a, b, c, d) = (ranked(f64::NAN), ranked(0.4), ranked(0.6), ranked(0.5));

        let top = top_summary([&a, &b, &c, &d]);
        assert_eq!(top.top1, 0.6);
        assert_eq!(top.top2, 0.5);
        assert!((top.mean_top_delta - 0.55).abs() < EPS);
    }
}
