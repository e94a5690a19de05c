// ==============================================================================
// config.rs - Analyzer Configuration
// ==============================================================================
// Description: Clonality thresholds and reference gene-list file names
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================
// Format: JSON, every field optional
// Example:
//   {
//     "thresholds": { "monoclonal_strong": 0.9 },
//     "reference_files": { "contaminant": "NonB_genes.txt" }
//   }
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or checking configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid threshold '{name}': {details}")]
    InvalidThreshold { name: &'static str, details: String },
}

/// Decision thresholds of the clonality classifier.
///
/// Percentages are fractions of a subtype group (list percent); the heavy
/// presence cut-off is a fraction of all verified reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierThresholds {
    /// Rows strictly above this count towards the monoclonal core
    pub monoclonal_strong: f64,
    pub monoclonal_strong_min_rows: usize,
    /// Exactly `monoclonal_floor_rows` rows must be strictly above this
    pub monoclonal_floor: f64,
    pub monoclonal_floor_rows: usize,

    /// Light rows strictly above this mark a dominant light chain
    pub light_chain_dominant: f64,
    pub light_chain_rows: usize,
    /// Heavy rows above this total frequency rule out light-chain-only
    pub heavy_presence_frequency: f64,

    /// Inclusive band of list percent typical of two co-dominant clones
    pub biclonal_band_low: f64,
    pub biclonal_band_high: f64,
    pub biclonal_min_rows: usize,
    pub biclonal_max_rows: usize,

    /// No variable row may exceed this for a polyclonal call
    pub polyclonal_variable_max: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            monoclonal_strong: 0.85,
            monoclonal_strong_min_rows: 3,
            monoclonal_floor: 0.75,
            monoclonal_floor_rows: 4,
            light_chain_dominant: 0.75,
            light_chain_rows: 2,
            heavy_presence_frequency: 0.001,
            biclonal_band_low: 0.35,
            biclonal_band_high: 0.65,
            biclonal_min_rows: 6,
            biclonal_max_rows: 8,
            polyclonal_variable_max: 0.20,
        }
    }
}

impl ClassifierThresholds {
    /// Check fractions lie in [0, 1] and ranges are ordered
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("monoclonal_strong", self.monoclonal_strong),
            ("monoclonal_floor", self.monoclonal_floor),
            ("light_chain_dominant", self.light_chain_dominant),
            ("heavy_presence_frequency", self.heavy_presence_frequency),
            ("biclonal_band_low", self.biclonal_band_low),
            ("biclonal_band_high", self.biclonal_band_high),
            ("polyclonal_variable_max", self.polyclonal_variable_max),
        ];

        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold {
                    name,
                    details: format!("{} is outside [0, 1]", value),
                });
            }
        }

        if self.biclonal_band_low > self.biclonal_band_high {
            return Err(ConfigError::InvalidThreshold {
                name: "biclonal_band_low",
                details: format!(
                    "band low {} exceeds band high {}",
                    self.biclonal_band_low, self.biclonal_band_high
                ),
            });
        }

        if self.biclonal_min_rows > self.biclonal_max_rows {
            return Err(ConfigError::InvalidThreshold {
                name: "biclonal_min_rows",
                details: format!(
                    "min rows {} exceeds max rows {}",
                    self.biclonal_min_rows, self.biclonal_max_rows
                ),
            });
        }

        Ok(())
    }
}

/// File names of the seven reference gene lists inside the resource directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceFiles {
    pub contaminant: String,
    pub heavy_variable: String,
    pub heavy_constant: String,
    pub kappa_variable: String,
    pub kappa_constant: String,
    pub lambda_variable: String,
    pub lambda_constant: String,
}

impl Default for ReferenceFiles {
    fn default() -> Self {
        Self {
            contaminant: "Non_Bcell_Contamination_GeneList_e98.txt".to_string(),
            heavy_variable: "IgH_Variable_Genes.txt".to_string(),
            heavy_constant: "IgH_Constant_Genes.txt".to_string(),
            kappa_variable: "IgK_Variable_Genes.txt".to_string(),
            kappa_constant: "IgK_Constant_Genes.txt".to_string(),
            lambda_variable: "IgL_Variable_Genes.txt".to_string(),
            lambda_constant: "IgL_Constant_Genes.txt".to_string(),
        }
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub thresholds: ClassifierThresholds,
    pub reference_files: ReferenceFiles,
}

impl AnalyzerConfig {
    /// Load configuration from a JSON file, filling omitted fields with defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let config: AnalyzerConfig = serde_json::from_reader(reader)?;
        config.thresholds.validate()?;
        Ok(config)
    }
}
