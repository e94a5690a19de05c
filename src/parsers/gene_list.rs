// ==============================================================================
// gene_list.rs - Reference Gene List Parser
// ==============================================================================
// Description: Parser for one-identifier-per-line gene list files
// Author: Matt Barham
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::open_text;

#[derive(Error, Debug)]
pub enum GeneListError {
    #[error("Failed to read gene list {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parser for reference gene lists (no header, one gene id per line)
pub struct GeneListParser;

impl GeneListParser {
    /// Read a gene list into a set. Blank lines and surrounding whitespace
    /// are ignored.
    pub fn parse(path: impl AsRef<Path>) -> Result<HashSet<String>, GeneListError> {
        let path = path.as_ref();
        let io_error = |source| GeneListError::IoError {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(open_text(path).map_err(io_error)?);
        let mut genes = HashSet::new();
        for line in reader.lines() {
            let line = line.map_err(io_error)?;
            let gene = line.trim();
            if !gene.is_empty() {
                genes.insert(gene.to_string());
            }
        }

        Ok(genes)
    }
}
