// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for read-counter tables and reference gene lists
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod featurecounts;
pub mod gene_list;

pub use featurecounts::{FeatureCountsParser, FeatureCountsParseError};
pub use gene_list::{GeneListParser, GeneListError};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Gzip magic number
pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a text input, decompressing transparently when it is gzipped
pub(crate) fn open_text(path: &Path) -> std::io::Result<Box<dyn Read>> {
    let mut reader = BufReader::new(File::open(path)?);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzip {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
