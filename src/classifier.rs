// ==============================================================================
// classifier.rs - Clonality Classification
// ==============================================================================
// Description: Rule-based clonality call over the Heavy and Light Ig tables
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Decision chain (default thresholds):
//   >= 3 rows above 0.85 and exactly 4 rows above 0.75     -> Monoclonal
//   exactly 2 Light rows above 0.75
//       no Heavy row above 0.001 total frequency            -> LightChainOnly
//       otherwise                                          -> ManualReview
//   6..=8 rows within [0.35, 0.65]                          -> Biclonal
//   no variable row above 0.20                              -> Polyclonal
//   otherwise                                              -> ManualReview
// ==============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClassifierThresholds;
use crate::models::{ClonalityVerdict, IgTableRow};

/// Row counts the decision chain looked at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationEvidence {
    pub rows_above_strong: usize,
    pub rows_above_floor: usize,
    pub light_rows_dominant: usize,
    pub heavy_rows_present: usize,
    pub rows_in_biclonal_band: usize,
    pub variable_rows_above_max: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub verdict: ClonalityVerdict,
    pub evidence: ClassificationEvidence,
}

impl ClassificationEvidence {
    pub fn collect(heavy: &[IgTableRow], light: &[IgTableRow], t: &ClassifierThresholds) -> Self {
        let complete = || heavy.iter().chain(light.iter());

        Self {
            rows_above_strong: count(complete(), |r| r.percentage > t.monoclonal_strong),
            rows_above_floor: count(complete(), |r| r.percentage > t.monoclonal_floor),
            light_rows_dominant: count(light.iter(), |r| r.percentage > t.light_chain_dominant),
            heavy_rows_present: count(heavy.iter(), |r| {
                r.total_frequency > t.heavy_presence_frequency
            }),
            rows_in_biclonal_band: count(complete(), |r| {
                r.percentage >= t.biclonal_band_low && r.percentage <= t.biclonal_band_high
            }),
            variable_rows_above_max: count(complete(), |r| {
                r.locus.is_variable() && r.percentage > t.polyclonal_variable_max
            }),
        }
    }
}

fn count<'a>(
    rows: impl Iterator<Item = &'a IgTableRow>,
    keep: impl Fn(&IgTableRow) -> bool,
) -> usize {
    rows.filter(|row| keep(row)).count()
}

/// Classify a sample's clonality from its Heavy and Light tables.
///
/// Exactly one branch fires; NaN percentages fail every comparison.
pub fn classify(
    heavy: &[IgTableRow],
    light: &[IgTableRow],
    thresholds: &ClassifierThresholds,
) -> Classification {
    let evidence = ClassificationEvidence::collect(heavy, light, thresholds);
    let verdict = decide(&evidence, thresholds);

    debug!("Clonality {:?} from {:?}", verdict, evidence);
    Classification { verdict, evidence }
}

fn decide(e: &ClassificationEvidence, t: &ClassifierThresholds) -> ClonalityVerdict {
    if e.rows_above_strong >= t.monoclonal_strong_min_rows
        && e.rows_above_floor == t.monoclonal_floor_rows
    {
        ClonalityVerdict::Monoclonal
    } else if e.light_rows_dominant == t.light_chain_rows {
        if e.heavy_rows_present == 0 {
            ClonalityVerdict::LightChainOnly
        } else {
            // prominent light chain alongside heavy signal
            ClonalityVerdict::ManualReview
        }
    } else if (t.biclonal_min_rows..=t.biclonal_max_rows).contains(&e.rows_in_biclonal_band) {
        ClonalityVerdict::Biclonal
    } else if e.variable_rows_above_max == 0 {
        ClonalityVerdict::Polyclonal
    } else {
        ClonalityVerdict::ManualReview
    }
}
