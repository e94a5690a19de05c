// ==============================================================================
// reference.rs - Reference Gene Set Loader
// ==============================================================================
// Description: Loads contaminant and Ig subtype gene lists from a resource dir
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::ReferenceFiles;
use crate::models::Subtype;
use crate::parsers::GeneListParser;

/// Static gene sets used to partition the count table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneReferenceSets {
    pub contaminant: HashSet<String>,
    pub heavy_variable: HashSet<String>,
    pub heavy_constant: HashSet<String>,
    pub kappa_variable: HashSet<String>,
    pub kappa_constant: HashSet<String>,
    pub lambda_variable: HashSet<String>,
    pub lambda_constant: HashSet<String>,
}

impl GeneReferenceSets {
    /// Load all seven gene lists from `resource_dir`
    pub fn load(resource_dir: impl AsRef<Path>, files: &ReferenceFiles) -> Result<Self> {
        let dir = resource_dir.as_ref();
        let read = |name: &str, file: &str| {
            GeneListParser::parse(dir.join(file))
                .with_context(|| format!("Failed to load {} gene list", name))
        };

        let sets = Self {
            contaminant: read("contaminant", &files.contaminant)?,
            heavy_variable: read("IGHV", &files.heavy_variable)?,
            heavy_constant: read("IGHC", &files.heavy_constant)?,
            kappa_variable: read("IGKV", &files.kappa_variable)?,
            kappa_constant: read("IGKC", &files.kappa_constant)?,
            lambda_variable: read("IGLV", &files.lambda_variable)?,
            lambda_constant: read("IGLC", &files.lambda_constant)?,
        };

        info!(
            "Loaded reference gene sets from {:?}: {} contaminant, {} Ig genes",
            dir,
            sets.contaminant.len(),
            Subtype::ALL.iter().map(|s| sets.genes(*s).len()).sum::<usize>()
        );
        sets.check_overlaps();

        Ok(sets)
    }

    /// Gene set of an Ig subtype
    pub fn genes(&self, subtype: Subtype) -> &HashSet<String> {
        match subtype {
            Subtype::Ighv => &self.heavy_variable,
            Subtype::Ighc => &self.heavy_constant,
            Subtype::Igkv => &self.kappa_variable,
            Subtype::Igkc => &self.kappa_constant,
            Subtype::Iglv => &self.lambda_variable,
            Subtype::Iglc => &self.lambda_constant,
        }
    }

    pub fn is_contaminant(&self, gene_id: &str) -> bool {
        self.contaminant.contains(gene_id)
    }

    /// Sets are disjoint by intent; a gene listed twice is counted in every
    /// set that names it, so flag it.
    fn check_overlaps(&self) {
        for (i, a) in Subtype::ALL.iter().enumerate() {
            if self.genes(*a).is_empty() {
                warn!("Reference gene list for {} is empty", a);
            }
            for b in &Subtype::ALL[i + 1..] {
                let shared = self.genes(*a).intersection(self.genes(*b)).count();
                if shared > 0 {
                    warn!("{} genes are listed in both {} and {}", shared, a, b);
                }
            }
        }
    }
}
