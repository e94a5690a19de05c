// ==============================================================================
// output.rs - Multi-Format Output Generation
// ==============================================================================
// Description: Write clonality results as plotting tables, JSON and SQLite
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

// SQLite for queryable database
use rusqlite::{params, Connection};

use crate::classifier::ClassificationEvidence;
use crate::metrics::round_to;
use crate::models::{IgTableRow, SampleSummary};

/// Column header of the Heavy and Light plotting tables
pub const TABLE_HEADER: [&str; 6] = [
    "CommonName",
    "Count",
    "Percentage",
    "TotalFrequency",
    "Locus",
    "ElementSize",
];

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-delimited tables, results record and title line (read by the plotting script)
    Tsv,
    /// JSON report (best for web APIs and downstream tooling)
    Json,
    /// SQLite database (best for querying across runs)
    Sqlite,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Tsv => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Sqlite => "db",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tsv" | "txt" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            "sqlite" | "db" => Ok(OutputFormat::Sqlite),
            other => Err(format!(
                "unknown output format '{}' (expected tsv, json or sqlite)",
                other
            )),
        }
    }
}

/// Provenance of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: uuid::Uuid,
    pub processing_date: String,
    pub tool_version: String,
    pub counts_file: String,
    pub counts_sha256: String,
    pub summary_file: String,
    pub summary_sha256: String,
    pub reference_dir: String,
    pub total_verified_reads: u64,
}

/// Everything a run produces, as serialized to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonalityReport {
    pub metadata: RunMetadata,
    pub summary: SampleSummary,
    pub evidence: ClassificationEvidence,
    pub heavy: Vec<IgTableRow>,
    pub light: Vec<IgTableRow>,
}

/// Multi-format output generator
pub struct OutputGenerator {
    sample_name: String,
    output_dir: PathBuf,
}

impl OutputGenerator {
    pub fn new(sample_name: String, output_dir: PathBuf) -> Self {
        Self {
            sample_name,
            output_dir,
        }
    }

    /// Write `report` in every requested format
    ///
    /// TSV output is always written, whether or not it is listed.
    ///
    /// # Returns
    /// * HashMap of format -> files written for it
    pub fn generate(
        &self,
        formats: &[OutputFormat],
        report: &ClonalityReport,
    ) -> Result<HashMap<OutputFormat, Vec<PathBuf>>> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", self.output_dir))?;

        let mut result = HashMap::new();
        result.insert(OutputFormat::Tsv, self.generate_tsv(report)?);

        for format in formats {
            let paths = match format {
                OutputFormat::Tsv => continue,
                OutputFormat::Json => vec![self.generate_json(&self.path_for(*format), report)?],
                OutputFormat::Sqlite => {
                    vec![self.generate_sqlite(&self.path_for(*format), report)?]
                }
            };
            result.insert(*format, paths);
        }

        Ok(result)
    }

    fn path_for(&self, format: OutputFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}purityChecker.{}", self.sample_name, format.extension()))
    }

    fn sample_path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.sample_name, suffix))
    }

    /// Plotting tables, results record and title line
    fn generate_tsv(&self, report: &ClonalityReport) -> Result<Vec<PathBuf>> {
        let heavy_path = self.sample_path("Graph_IgH.txt");
        let light_path = self.sample_path("Graph_IgL.txt");
        let results_path = self.sample_path("purityCheckerResults.txt");
        let title_path = self.sample_path("title.txt");

        info!("Generating TSV output in {:?}", self.output_dir);

        write_table(&heavy_path, &report.heavy).context("Failed to write IgH table")?;
        write_table(&light_path, &report.light).context("Failed to write IgL table")?;
        write_results(&results_path, &report.summary)
            .context("Failed to write purity checker results")?;
        std::fs::write(&title_path, title_line(&report.summary))
            .context("Failed to write title file")?;

        info!(
            "TSV output complete: {} heavy rows, {} light rows",
            report.heavy.len(),
            report.light.len()
        );

        Ok(vec![heavy_path, light_path, results_path, title_path])
    }

    /// Generate JSON output
    fn generate_json(&self, path: &Path, report: &ClonalityReport) -> Result<PathBuf> {
        info!("Generating JSON output: {:?}", path);

        let file = File::create(path).context("Failed to create JSON output file")?;

        serde_json::to_writer_pretty(BufWriter::new(file), report)
            .context("Failed to write JSON output")?;

        Ok(path.to_path_buf())
    }

    /// Generate SQLite output
    fn generate_sqlite(&self, path: &Path, report: &ClonalityReport) -> Result<PathBuf> {
        info!("Generating SQLite output: {:?}", path);

        // A rerun replaces the previous database instead of failing on CREATE TABLE
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove stale SQLite database")?;
        }

        let mut conn = Connection::open(path).context("Failed to create SQLite database")?;

        for table in ["ig_heavy", "ig_light"] {
            conn.execute(
                &format!(
                    "CREATE TABLE {} (
                        common_name TEXT NOT NULL,
                        count INTEGER NOT NULL,
                        percentage REAL,
                        total_frequency REAL,
                        locus TEXT NOT NULL,
                        element_size INTEGER NOT NULL
                    )",
                    table
                ),
                [],
            )
            .with_context(|| format!("Failed to create {} table", table))?;
        }

        conn.execute(
            "CREATE TABLE summary (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create summary table")?;

        conn.execute(
            "CREATE TABLE metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create metadata table")?;

        let m = &report.metadata;
        let run_id = m.run_id.to_string();
        let total_verified_reads = m.total_verified_reads.to_string();
        let metadata_items = vec![
            ("run_id", &run_id),
            ("processing_date", &m.processing_date),
            ("tool_version", &m.tool_version),
            ("counts_file", &m.counts_file),
            ("counts_sha256", &m.counts_sha256),
            ("summary_file", &m.summary_file),
            ("summary_sha256", &m.summary_sha256),
            ("reference_dir", &m.reference_dir),
            ("total_verified_reads", &total_verified_reads),
        ];

        let tx = conn.transaction().context("Failed to start transaction")?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
                .context("Failed to prepare metadata insert")?;
            for (key, value) in metadata_items {
                stmt.execute(params![key, value])
                    .context("Failed to insert metadata")?;
            }

            let mut stmt = tx
                .prepare("INSERT INTO summary (key, value) VALUES (?1, ?2)")
                .context("Failed to prepare summary insert")?;
            for (key, value) in SampleSummary::LABELS.iter().zip(report.summary.values()) {
                stmt.execute(params![key, value])
                    .context("Failed to insert summary field")?;
            }

            for (table, rows) in [("ig_heavy", &report.heavy), ("ig_light", &report.light)] {
                let mut stmt = tx
                    .prepare(&format!(
                        "INSERT INTO {} (common_name, count, percentage, total_frequency, locus, element_size)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        table
                    ))
                    .with_context(|| format!("Failed to prepare {} insert statement", table))?;

                for row in rows.iter() {
                    stmt.execute(params![
                        row.common_name,
                        row.count as i64,
                        finite(row.percentage),
                        finite(row.total_frequency),
                        row.locus.as_str(),
                        row.element_size as i64,
                    ])
                    .with_context(|| format!("Failed to insert {} row", table))?;
                }
            }
        }
        tx.commit().context("Failed to commit results")?;

        conn.execute("CREATE INDEX idx_ig_heavy_locus ON ig_heavy(locus)", [])
            .context("Failed to create heavy locus index")?;
        conn.execute("CREATE INDEX idx_ig_light_locus ON ig_light(locus)", [])
            .context("Failed to create light locus index")?;

        info!(
            "SQLite output complete: {} heavy rows, {} light rows",
            report.heavy.len(),
            report.light.len()
        );

        Ok(path.to_path_buf())
    }
}

/// NaN is stored as NULL
fn finite(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Floats with 12 decimals; NaN is written as an empty field
fn format_fraction(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{:.12}", value)
    }
}

fn write_table(path: &Path, rows: &[IgTableRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(TABLE_HEADER)?;
    for row in rows {
        writer.write_record([
            row.common_name.clone(),
            row.count.to_string(),
            format_fraction(row.percentage),
            format_fraction(row.total_frequency),
            row.locus.as_str().to_string(),
            row.element_size.to_string(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}

/// Label row then value row; every field is followed by a tab
fn write_results(path: &Path, summary: &SampleSummary) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    for label in SampleSummary::LABELS {
        write!(out, "{}\t", label)?;
    }
    writeln!(out)?;
    for value in summary.values() {
        write!(out, "{}\t", value)?;
    }
    out.flush()?;

    Ok(())
}

/// Caption for the plotting script
pub fn title_line(summary: &SampleSummary) -> String {
    let l = &summary.locus_totals;
    format!(
        "Percent Ig = {} ; Kappa/(K+L) = {} ; Lambda/(K+L) = {} ; Non B Contamination = {}",
        round_to(l.percent_ig, 4),
        round_to(l.percent_kappa, 4),
        round_to(l.percent_lambda, 4),
        summary.nonb_contamination
    )
}
