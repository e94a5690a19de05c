// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates featureCounts inputs (size, compression, header) and
//              records their SHA-256 digests for provenance
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::parsers::{open_text, GZIP_MAGIC};

const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GB

/// Which featureCounts output a file is expected to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    CountsTable,
    CountsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub kind: InputKind,
    pub size: u64,
    pub compressed: bool,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct InputValidator {
    max_file_size: u64,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn validate(&self, path: &Path, kind: InputKind) -> Result<ValidatedInput> {
        info!("Validating {:?} input: {:?}", kind, path);

        // 1. Existence and size check
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata for {:?}", path))?;
        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {:?}", path);
        }

        let size = metadata.len();
        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        if size == 0 {
            anyhow::bail!("File is empty: {:?}", path);
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Compression sniffing
        let compressed = self.read_magic_number(path)? == GZIP_MAGIC;
        debug!("Compressed: {}", compressed);

        // 3. Content validation (header line)
        self.validate_header(path, kind)?;
        debug!("Header check passed");

        // 4. Compute SHA-256 hash
        let hash = self.compute_sha256(path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedInput {
            path: path.to_path_buf(),
            kind,
            size,
            compressed,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn read_magic_number(&self, path: &Path) -> Result<[u8; 2]> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; 2];
        let n = file.read(&mut buffer)?;
        if n < buffer.len() {
            // too short to carry a gzip header
            return Ok([0, 0]);
        }
        Ok(buffer)
    }

    /// First line that is not a `#` comment must be the expected header
    fn validate_header(&self, path: &Path, kind: InputKind) -> Result<()> {
        let reader = BufReader::new(open_text(path)?);

        let mut header = None;
        for line in reader.lines() {
            let line = line.with_context(|| format!("Failed to read {:?}", path))?;
            if !line.starts_with('#') && !line.trim().is_empty() {
                header = Some(line);
                break;
            }
        }
        let header = header.ok_or_else(|| anyhow::anyhow!("No header line in {:?}", path))?;
        let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

        match kind {
            InputKind::CountsTable => {
                for required in ["Geneid", "Length"] {
                    if !columns.contains(&required) {
                        anyhow::bail!(
                            "Invalid featureCounts table: header lacks '{}' column",
                            required
                        );
                    }
                }
            }
            InputKind::CountsSummary => {
                if columns.first() != Some(&"Status") || columns.len() < 2 {
                    anyhow::bail!("Invalid featureCounts summary: header must start with 'Status'");
                }
            }
        }

        Ok(())
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
