// ==============================================================================
// models.rs - Ig Purity Data Models
// ==============================================================================
// Description: Data structures for per-gene counts, Ig aggregates and verdicts
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Summary statuses whose reads count towards normalization.
pub const VERIFIED_STATUSES: [&str; 2] = ["Assigned", "Unassigned_NoFeatures"];

/// One row of the read counter's per-gene table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneCountRecord {
    /// Gene identifier (gene_name attribute, or a locus pseudo-gene)
    pub gene_id: String,

    /// Reads assigned to the gene
    pub raw_count: u64,

    /// Gene length in base pairs (always > 0)
    pub length_bp: u64,
}

/// Read-count summary: status label -> read count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountSummary {
    statuses: BTreeMap<String, u64>,
}

impl CountSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a status count. Repeated labels accumulate.
    pub fn insert(&mut self, status: impl Into<String>, count: u64) {
        *self.statuses.entry(status.into()).or_insert(0) += count;
    }

    pub fn get(&self, status: &str) -> Option<u64> {
        self.statuses.get(status).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Sum of `Assigned` and `Unassigned_NoFeatures` reads
    pub fn total_verified_reads(&self) -> u64 {
        VERIFIED_STATUSES
            .iter()
            .filter_map(|status| self.get(status))
            .sum()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CountSummary {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut summary = CountSummary::new();
        for (status, count) in iter {
            summary.insert(status, count);
        }
        summary
    }
}

/// Normalized per-gene coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedGeneMetric {
    pub gene_id: String,
    pub raw_count: u64,
    pub length_bp: u64,
    pub reads_per_bp: f64,
    /// Reads per kilobase per million verified reads. Length is in bp, hence
    /// a 1e9 scale factor.
    pub rpkm: f64,
}

/// Ig locus x segment combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtype {
    #[serde(rename = "IGHV")]
    Ighv,
    #[serde(rename = "IGHC")]
    Ighc,
    #[serde(rename = "IGKV")]
    Igkv,
    #[serde(rename = "IGKC")]
    Igkc,
    #[serde(rename = "IGLV")]
    Iglv,
    #[serde(rename = "IGLC")]
    Iglc,
}

impl Subtype {
    pub const ALL: [Subtype; 6] = [
        Subtype::Ighv,
        Subtype::Ighc,
        Subtype::Igkv,
        Subtype::Igkc,
        Subtype::Iglv,
        Subtype::Iglc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::Ighv => "IGHV",
            Subtype::Ighc => "IGHC",
            Subtype::Igkv => "IGKV",
            Subtype::Igkc => "IGKC",
            Subtype::Iglv => "IGLV",
            Subtype::Iglc => "IGLC",
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Subtype::Ighv | Subtype::Igkv | Subtype::Iglv)
    }

    pub fn is_heavy(&self) -> bool {
        matches!(self, Subtype::Ighv | Subtype::Ighc)
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gene row of the Heavy or Light result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgTableRow {
    #[serde(rename = "CommonName")]
    pub common_name: String,

    #[serde(rename = "Count")]
    pub count: u64,

    /// Share of the subtype group's reads (list percent)
    #[serde(rename = "Percentage")]
    pub percentage: f64,

    /// Share of all verified reads
    #[serde(rename = "TotalFrequency")]
    pub total_frequency: f64,

    #[serde(rename = "Locus")]
    pub locus: Subtype,

    #[serde(rename = "ElementSize")]
    pub element_size: u64,
}

/// Summed raw counts per subtype
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtypeTotals {
    pub ighc: u64,
    pub ighv: u64,
    pub igkc: u64,
    pub igkv: u64,
    pub iglc: u64,
    pub iglv: u64,
}

impl SubtypeTotals {
    pub fn get(&self, subtype: Subtype) -> u64 {
        match subtype {
            Subtype::Ighc => self.ighc,
            Subtype::Ighv => self.ighv,
            Subtype::Igkc => self.igkc,
            Subtype::Igkv => self.igkv,
            Subtype::Iglc => self.iglc,
            Subtype::Iglv => self.iglv,
        }
    }

    pub fn add(&mut self, subtype: Subtype, count: u64) {
        let slot = match subtype {
            Subtype::Ighc => &mut self.ighc,
            Subtype::Ighv => &mut self.ighv,
            Subtype::Igkc => &mut self.igkc,
            Subtype::Igkv => &mut self.igkv,
            Subtype::Iglc => &mut self.iglc,
            Subtype::Iglv => &mut self.iglv,
        };
        *slot += count;
    }

    pub fn light_variable(&self) -> u64 {
        self.igkv + self.iglv
    }

    pub fn light_constant(&self) -> u64 {
        self.igkc + self.iglc
    }

    /// Denominator for a subtype's list percent. Kappa and lambda share a
    /// combined total per segment since a clone expresses one light locus.
    pub fn group_total(&self, subtype: Subtype) -> u64 {
        match subtype {
            Subtype::Ighv | Subtype::Ighc => self.get(subtype),
            Subtype::Igkv | Subtype::Iglv => self.light_variable(),
            Subtype::Igkc | Subtype::Iglc => self.light_constant(),
        }
    }
}

/// Whole-locus read totals and the ratios derived from them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocusTotals {
    pub total_igh: u64,
    pub total_igk: u64,
    pub total_igl: u64,
    pub total_ig: u64,
    pub percent_ig: f64,
    pub total_light_chain: u64,
    pub total_light_variable: u64,
    pub total_light_constant: u64,
    /// NaN when no light-chain reads were counted
    pub percent_kappa: f64,
    pub percent_lambda: f64,
}

impl LocusTotals {
    pub fn new(
        total_igh: u64,
        total_igk: u64,
        total_igl: u64,
        subtypes: &SubtypeTotals,
        total_verified_reads: u64,
    ) -> Self {
        let total_ig = total_igh + total_igk + total_igl;
        let total_light_chain = total_igk + total_igl;

        Self {
            total_igh,
            total_igk,
            total_igl,
            total_ig,
            percent_ig: total_ig as f64 / total_verified_reads as f64,
            total_light_chain,
            total_light_variable: subtypes.light_variable(),
            total_light_constant: subtypes.light_constant(),
            percent_kappa: total_igk as f64 / total_light_chain as f64,
            percent_lambda: total_igl as f64 / total_light_chain as f64,
        }
    }
}

/// Gene groups ranked for primary/secondary extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingGroup {
    HeavyConstant,
    HeavyVariable,
    /// IGKC and IGLC rows combined
    LightConstant,
    /// IGKV and IGLV rows combined
    LightVariable,
}

impl RankingGroup {
    pub const ALL: [RankingGroup; 4] = [
        RankingGroup::HeavyConstant,
        RankingGroup::HeavyVariable,
        RankingGroup::LightConstant,
        RankingGroup::LightVariable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingGroup::HeavyConstant => "IGHC",
            RankingGroup::HeavyVariable => "IGHV",
            RankingGroup::LightConstant => "IGKC+IGLC",
            RankingGroup::LightVariable => "IGKV+IGLV",
        }
    }

    pub fn members(&self) -> &'static [Subtype] {
        match self {
            RankingGroup::HeavyConstant => &[Subtype::Ighc],
            RankingGroup::HeavyVariable => &[Subtype::Ighv],
            RankingGroup::LightConstant => &[Subtype::Igkc, Subtype::Iglc],
            RankingGroup::LightVariable => &[Subtype::Igkv, Subtype::Iglv],
        }
    }
}

/// The two most-read genes of a ranking group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimarySecondary {
    pub group: RankingGroup,
    pub primary: String,
    pub primary_freq: f64,
    pub secondary: String,
    pub secondary_freq: f64,
    /// primary_freq - secondary_freq
    pub delta: f64,
}

/// Overall top two primaries across the four ranking groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopSummary {
    pub top1: f64,
    pub top2: f64,
    pub top1_delta: f64,
    pub top2_delta: f64,
    pub mean_top_delta: f64,
}

/// Clonality call for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClonalityVerdict {
    Monoclonal,
    Polyclonal,
    Biclonal,
    LightChainOnly,
    ManualReview,
}

impl ClonalityVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            ClonalityVerdict::Monoclonal => "Likely Monoclonal",
            ClonalityVerdict::Polyclonal => "Likely Polyclonal",
            ClonalityVerdict::Biclonal => "Likely Biclonal",
            ClonalityVerdict::LightChainOnly => "Likely Light Chain Only",
            ClonalityVerdict::ManualReview => "Manual Review Required",
        }
    }
}

impl fmt::Display for ClonalityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wide per-sample record consumed positionally by the plotting script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub sample: String,
    pub heavy_constant: PrimarySecondary,
    pub heavy_variable: PrimarySecondary,
    pub light_constant: PrimarySecondary,
    pub light_variable: PrimarySecondary,
    pub subtype_totals: SubtypeTotals,
    pub locus_totals: LocusTotals,
    pub top: TopSummary,
    /// Geometric mean of (RPKM + 1) over non-B-cell contaminant genes
    pub nonb_contamination: f64,
    pub clonality: ClonalityVerdict,
}

impl SampleSummary {
    /// Labels in the order the plotting script reads them
    pub const LABELS: [&'static str; 38] = [
        "Sample",
        "PrimaryIgHC",
        "PrimaryIgHC_Freq",
        "SecondaryIgHC",
        "DeltaIgHC",
        "PrimaryIgHV",
        "PrimaryIgHV_Freq",
        "SecondaryIgHV",
        "DeltaIgHV",
        "PrimaryIgLC",
        "PrimaryIgLC_Freq",
        "SecondaryIgLC",
        "DeltaIgLC",
        "PrimaryIgLV",
        "PrimaryIgLV_Freq",
        "SecondaryIgLV",
        "DeltaIgLV",
        "TOTAL_IGHC_READS",
        "TOTAL_IGHV_READS",
        "TOTAL_IGKC_READS",
        "TOTAL_IGKV_READS",
        "TOTAL_IGLC_READS",
        "TOTAL_IGLV_READS",
        "TOTAL_IGH",
        "TOTAL_IGK",
        "TOTAL_IGL",
        "TOTAL_IG",
        "PERCENT_IG",
        "TOTAL_LIGHT_CHAIN",
        "TOTAL_LIGHT_VARIABLE",
        "TOTAL_LIGHT_CONSTANT",
        "PERCENT_KAPPA",
        "PERCENT_LAMBDA",
        "Top1",
        "Top2",
        "Mean_Top_Delta",
        "NonB_Contamination",
        "Clonality",
    ];

    /// Values matching `LABELS` position by position
    pub fn values(&self) -> Vec<String> {
        let mut values = Vec::with_capacity(Self::LABELS.len());
        values.push(self.sample.clone());

        for ranked in [
            &self.heavy_constant,
            &self.heavy_variable,
            &self.light_constant,
            &self.light_variable,
        ] {
            values.push(ranked.primary.clone());
            values.push(ranked.primary_freq.to_string());
            values.push(ranked.secondary.clone());
            values.push(ranked.delta.to_string());
        }

        let s = &self.subtype_totals;
        let l = &self.locus_totals;
        values.extend([
            s.ighc.to_string(),
            s.ighv.to_string(),
            s.igkc.to_string(),
            s.igkv.to_string(),
            s.iglc.to_string(),
            s.iglv.to_string(),
            l.total_igh.to_string(),
            l.total_igk.to_string(),
            l.total_igl.to_string(),
            l.total_ig.to_string(),
            l.percent_ig.to_string(),
            l.total_light_chain.to_string(),
            l.total_light_variable.to_string(),
            l.total_light_constant.to_string(),
            l.percent_kappa.to_string(),
            l.percent_lambda.to_string(),
            self.top.top1.to_string(),
            self.top.top2.to_string(),
            self.top.mean_top_delta.to_string(),
            self.nonb_contamination.to_string(),
            self.clonality.label().to_string(),
        ]);

        values
    }
}
