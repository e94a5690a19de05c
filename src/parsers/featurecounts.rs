// ==============================================================================
// featurecounts.rs - featureCounts Output Parser
// ==============================================================================
// Description: Parser for featureCounts per-gene tables and summary tables
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================
// Format: Tab-delimited text, '#' program/command comment line, header row
// Example (counts):
//   # Program:featureCounts v2.0.1; Command:"featureCounts" "-g" "gene_name" ...
//   Geneid    Chr    Start    End    Strand    Length    /data/sample.bam
//   IGHM    chr14;chr14    105851705;105853000    105852000;105856218    -;-    1722    5310
// Example (summary):
//   Status    /data/sample.bam
//   Assigned    1223301
//   Unassigned_NoFeatures    38811
// ==============================================================================

use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::open_text;
use crate::models::{CountSummary, GeneCountRecord};

/// Errors that can occur while parsing featureCounts output
#[derive(Error, Debug)]
pub enum FeatureCountsParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Tab-delimited parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column '{0}' in header")]
    MissingColumn(String),

    #[error("Invalid read count at line {line}: {value}")]
    InvalidCount { line: u64, value: String },

    #[error("Invalid gene length at line {line}: {value} (must be a positive integer)")]
    InvalidLength { line: u64, value: String },

    #[error("Table is empty or contains only a header")]
    EmptyFile,
}

/// Parser for featureCounts output files
pub struct FeatureCountsParser;

impl FeatureCountsParser {
    /// Parse a featureCounts per-gene table
    ///
    /// # Arguments
    /// * `path` - Path to the counts table (plain text or gzipped)
    ///
    /// # Returns
    /// * `Ok(Vec<GeneCountRecord>)` - One record per gene, in file order
    /// * `Err(FeatureCountsParseError)` - Parse error
    ///
    /// # Format
    /// Columns are located by name: `Geneid`, `Length`, and the read count in
    /// the first column after `Length` (featureCounts names it after the
    /// alignment file). Additional count columns are ignored.
    pub fn parse_counts(path: impl AsRef<Path>) -> Result<Vec<GeneCountRecord>, FeatureCountsParseError> {
        let input = open_text(path.as_ref())?;
        Self::read_counts(input)
    }

    /// Parse a featureCounts `.summary` table
    ///
    /// Only the first count column is read. Status labels are kept verbatim.
    pub fn parse_summary(path: impl AsRef<Path>) -> Result<CountSummary, FeatureCountsParseError> {
        let input = open_text(path.as_ref())?;
        Self::read_summary(input)
    }

    fn read_counts<R: Read>(input: R) -> Result<Vec<GeneCountRecord>, FeatureCountsParseError> {
        let mut reader = tab_reader(input);
        let headers = reader.headers()?.clone();

        let gene_idx = column_index(&headers, "Geneid")?;
        let length_idx = column_index(&headers, "Length")?;
        let count_idx = length_idx + 1;
        if headers.get(count_idx).is_none() {
            return Err(FeatureCountsParseError::MissingColumn("Count".to_string()));
        }

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let gene_id = row.get(gene_idx).unwrap_or_default().trim().to_string();
            let count_str = row.get(count_idx).unwrap_or_default().trim();
            let length_str = row.get(length_idx).unwrap_or_default().trim();

            let raw_count = count_str.parse::<u64>().map_err(|_| {
                FeatureCountsParseError::InvalidCount {
                    line,
                    value: count_str.to_string(),
                }
            })?;

            let length_bp = length_str
                .parse::<u64>()
                .ok()
                .filter(|length| *length > 0)
                .ok_or_else(|| FeatureCountsParseError::InvalidLength {
                    line,
                    value: length_str.to_string(),
                })?;

            records.push(GeneCountRecord {
                gene_id,
                raw_count,
                length_bp,
            });
        }

        if records.is_empty() {
            return Err(FeatureCountsParseError::EmptyFile);
        }

        debug!("Parsed {} gene count records", records.len());
        Ok(records)
    }

    fn read_summary<R: Read>(input: R) -> Result<CountSummary, FeatureCountsParseError> {
        let mut reader = tab_reader(input);
        let headers = reader.headers()?.clone();

        let status_idx = column_index(&headers, "Status")?;
        let count_idx = status_idx + 1;
        if headers.get(count_idx).is_none() {
            return Err(FeatureCountsParseError::MissingColumn("Count".to_string()));
        }

        let mut summary = CountSummary::new();
        for result in reader.records() {
            let row = result?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let status = row.get(status_idx).unwrap_or_default().trim();
            let count_str = row.get(count_idx).unwrap_or_default().trim();
            let count = count_str.parse::<u64>().map_err(|_| {
                FeatureCountsParseError::InvalidCount {
                    line,
                    value: count_str.to_string(),
                }
            })?;

            summary.insert(status, count);
        }

        if summary.is_empty() {
            return Err(FeatureCountsParseError::EmptyFile);
        }

        debug!("Parsed {} summary statuses", summary.len());
        Ok(summary)
    }
}

fn tab_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .comment(Some(b'#'))
        .quoting(false)
        .from_reader(input)
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, FeatureCountsParseError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| FeatureCountsParseError::MissingColumn(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Create a temporary test file with the given contents
    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const COUNTS: &str = "\
# Program:featureCounts v2.0.1; Command:\"featureCounts\" \"-g\" \"gene_name\"
Geneid\tChr\tStart\tEnd\tStrand\tLength\t/data/sample.bam
IGHM\tchr14;chr14\t105851705;105853000\t105852000;105856218\t-;-\t1722\t5310
IGKC\tchr2\t88857161\t88857683\t-\t523\t12000
HEAVY_Locus\tchr14\t105586437\t106879844\t-\t1293408\t9000
";

    #[test]
    fn test_parse_counts() {
        let file = create_test_file(COUNTS);
        let records = FeatureCountsParser::parse_counts(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].gene_id, "IGHM");
        assert_eq!(records[0].raw_count, 5310);
        assert_eq!(records[0].length_bp, 1722);
        assert_eq!(records[2].gene_id, "HEAVY_Locus");
        assert_eq!(records[2].length_bp, 1293408);
    }

    #[test]
    fn test_parse_gzipped_counts() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(COUNTS.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&compressed).unwrap();
        file.flush().unwrap();

        let records = FeatureCountsParser::parse_counts(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].gene_id, "IGKC");
        assert_eq!(records[1].raw_count, 12000);
    }

    #[test]
    fn test_extra_count_columns_ignored() {
        let contents = "\
Geneid\tChr\tStart\tEnd\tStrand\tLength\ta.bam\tb.bam
IGHG1\tchr14\t1\t100\t-\t100\t7\t99
";
        let file = create_test_file(contents);
        let records = FeatureCountsParser::parse_counts(file.path()).unwrap();
        assert_eq!(records[0].raw_count, 7);
    }

    #[test]
    fn test_missing_length_column() {
        let contents = "\
Geneid\tChr\tStart\tEnd\tStrand\tsample.bam
IGHM\tchr14\t1\t100\t-\t10
";
        let file = create_test_file(contents);
        match FeatureCountsParser::parse_counts(file.path()).unwrap_err() {
            FeatureCountsParseError::MissingColumn(column) => assert_eq!(column, "Length"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_count() {
        let contents = "\
# comment
Geneid\tChr\tStart\tEnd\tStrand\tLength\tsample.bam
IGHM\tchr14\t1\t100\t-\t100\tNOT_A_NUMBER
";
        let file = create_test_file(contents);
        match FeatureCountsParser::parse_counts(file.path()).unwrap_err() {
            FeatureCountsParseError::InvalidCount { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "NOT_A_NUMBER");
            }
            other => panic!("Expected InvalidCount error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let contents = "\
Geneid\tChr\tStart\tEnd\tStrand\tLength\tsample.bam
IGHM\tchr14\t1\t100\t-\t0\t10
";
        let file = create_test_file(contents);
        assert!(matches!(
            FeatureCountsParser::parse_counts(file.path()).unwrap_err(),
            FeatureCountsParseError::InvalidLength { .. }
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let contents = "Geneid\tChr\tStart\tEnd\tStrand\tLength\tsample.bam\n";
        let file = create_test_file(contents);
        assert!(matches!(
            FeatureCountsParser::parse_counts(file.path()).unwrap_err(),
            FeatureCountsParseError::EmptyFile
        ));
    }

    #[test]
    fn test_parse_summary() {
        let contents = "\
Status\t/data/sample.bam
Assigned\t1223301
Unassigned_Unmapped\t0
Unassigned_MultiMapping\t400
Unassigned_NoFeatures\t38811
";
        let file = create_test_file(contents);
        let summary = FeatureCountsParser::parse_summary(file.path()).unwrap();

        assert_eq!(summary.len(), 4);
        assert_eq!(summary.get("Assigned"), Some(1223301));
        assert_eq!(summary.total_verified_reads(), 1223301 + 38811);
    }

    #[test]
    fn test_summary_requires_status_header() {
        let contents = "Label\tsample.bam\nAssigned\t10\n";
        let file = create_test_file(contents);
        match FeatureCountsParser::parse_summary(file.path()).unwrap_err() {
            FeatureCountsParseError::MissingColumn(column) => assert_eq!(column, "Status"),
            other => panic!("Expected MissingColumn error, got {:?}", other),
        }
    }
}
