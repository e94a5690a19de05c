// ==============================================================================
// error.rs - Analysis Error Taxonomy
// ==============================================================================
// Description: Fail-fast conditions raised while deriving Ig metrics
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use thiserror::Error;

/// Preconditions that abort a sample's analysis.
///
/// All variants indicate malformed or incompatible input/reference data, so
/// none of them are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No verified reads in count summary (Assigned + Unassigned_NoFeatures = 0)")]
    ZeroReads,

    #[error("Gene group '{group}' is empty in the count table")]
    EmptyGroup { group: String },

    #[error("Locus row '{locus}' must appear exactly once in the count table, found {found}")]
    MissingLocusRow { locus: String, found: usize },

    #[error("Gene group '{group}' needs at least 2 genes for primary/secondary ranking, found {found}")]
    InsufficientGenes { group: String, found: usize },
}
