// ==============================================================================
// processor.rs - Core Purity Analysis Pipeline
// ==============================================================================
// Description: Runs one sample from featureCounts output to a clonality call
//              and its result files
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 3.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::audit::{AuditEventType, AuditLog};
use crate::classifier::{classify, Classification};
use crate::config::AnalyzerConfig;
use crate::metrics::derive_metrics;
use crate::models::{ClonalityVerdict, SampleSummary};
use crate::output::{ClonalityReport, OutputFormat, OutputGenerator, RunMetadata};
use crate::parsers::FeatureCountsParser;
use crate::reference::GeneReferenceSets;
use crate::validator::{InputKind, InputValidator, ValidatedInput};

/// Result of a successful run
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub run_id: Uuid,
    pub verdict: ClonalityVerdict,
    pub classification: Classification,
    pub outputs: HashMap<OutputFormat, Vec<PathBuf>>,
}

pub struct PurityProcessor {
    run_id: Uuid,
    sample_name: String,
    counts_path: PathBuf,
    summary_path: PathBuf,
    resource_dir: PathBuf,
    output_dir: PathBuf,
    config: AnalyzerConfig,
    formats: Vec<OutputFormat>,
}

impl PurityProcessor {
    pub fn new(
        sample_name: String,
        counts_path: PathBuf,
        summary_path: PathBuf,
        resource_dir: PathBuf,
        output_dir: PathBuf,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            sample_name,
            counts_path,
            summary_path,
            resource_dir,
            output_dir,
            config,
            formats: vec![OutputFormat::Tsv],
        }
    }

    /// Extra structured formats; TSV output is always written
    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Main processing pipeline, with its audit trail
    pub fn process(&self) -> Result<ProcessingOutcome> {
        let mut audit = AuditLog::open(&self.output_dir, &self.sample_name, self.run_id)?;
        audit.log(
            AuditEventType::RunStarted,
            serde_json::json!({
                "sample": self.sample_name,
                "counts": self.counts_path,
                "summary": self.summary_path,
                "resource_dir": self.resource_dir,
                "tool_version": env!("CARGO_PKG_VERSION"),
            }),
        )?;

        match self.run(&mut audit) {
            Ok(outcome) => {
                audit.log(
                    AuditEventType::RunCompleted,
                    serde_json::json!({
                        "verdict": outcome.verdict.label(),
                        "outputs": outcome.outputs.values().flatten().collect::<Vec<_>>(),
                        "success": true,
                    }),
                )?;
                Ok(outcome)
            }
            Err(e) => Err(self.record_failure(&mut audit, e)),
        }
    }

    /// Audit a failed run; the analysis error is returned even if the audit write fails
    fn record_failure(&self, audit: &mut AuditLog, e: anyhow::Error) -> anyhow::Error {
        warn!("Processing failed for {}: {:#}", self.sample_name, e);
        let logged = audit.log(
            AuditEventType::RunFailed,
            serde_json::json!({
                "error": format!("{:#}", e),
                "success": false,
            }),
        );
        if let Err(audit_err) = logged {
            warn!("Failed to record run failure in {:?}: {:#}", audit.path(), audit_err);
        }
        e
    }

    fn run(&self, audit: &mut AuditLog) -> Result<ProcessingOutcome> {
        info!("Starting purity analysis for sample {} (run {})", self.sample_name, self.run_id);

        // 1. Validate inputs
        let validator = InputValidator::new();
        let counts_input = validator
            .validate(&self.counts_path, InputKind::CountsTable)
            .context("Counts table validation failed")?;
        let summary_input = validator
            .validate(&self.summary_path, InputKind::CountsSummary)
            .context("Counts summary validation failed")?;
        for input in [&counts_input, &summary_input] {
            audit.log(AuditEventType::InputValidated, serde_json::to_value(input)?)?;
        }

        // 2. Parse featureCounts output
        info!("Parsing featureCounts table: {:?}", self.counts_path);
        let records = FeatureCountsParser::parse_counts(&self.counts_path)
            .context("Failed to parse featureCounts table")?;
        let summary = FeatureCountsParser::parse_summary(&self.summary_path)
            .context("Failed to parse featureCounts summary")?;
        info!("Parsed {} genes, {} summary statuses", records.len(), summary.len());

        // 3. Load reference gene sets
        let references = GeneReferenceSets::load(&self.resource_dir, &self.config.reference_files)
            .context("Failed to load reference gene sets")?;

        // 4. Derive per-gene metrics
        let metrics = derive_metrics(&records, &summary, &references)
            .context("Failed to derive gene metrics")?;
        info!(
            "{} verified reads, non-B contamination {}",
            metrics.total_verified_reads, metrics.contaminant_geomean
        );

        // 5. Aggregate into Heavy/Light tables
        let aggregate = aggregate(&metrics, &references).context("Failed to aggregate Ig loci")?;
        info!(
            "Ig tables built: {} heavy rows, {} light rows, percent Ig {:.4}",
            aggregate.heavy.len(),
            aggregate.light.len(),
            aggregate.locus_totals.percent_ig
        );

        // 6. Classify
        let classification = classify(&aggregate.heavy, &aggregate.light, &self.config.thresholds);
        info!("Clonality: {}", classification.verdict);

        // 7. Assemble the report; nothing is written before this point
        let report = ClonalityReport {
            metadata: self.run_metadata(&counts_input, &summary_input, metrics.total_verified_reads),
            summary: SampleSummary {
                sample: self.sample_name.clone(),
                heavy_constant: aggregate.heavy_constant,
                heavy_variable: aggregate.heavy_variable,
                light_constant: aggregate.light_constant,
                light_variable: aggregate.light_variable,
                subtype_totals: aggregate.subtype_totals,
                locus_totals: aggregate.locus_totals,
                top: aggregate.top,
                nonb_contamination: metrics.contaminant_geomean,
                clonality: classification.verdict,
            },
            evidence: classification.evidence,
            heavy: aggregate.heavy,
            light: aggregate.light,
        };

        // 8. Write outputs
        info!("Generating output files");
        let generator = OutputGenerator::new(self.sample_name.clone(), self.output_dir.clone());
        let outputs = generator
            .generate(&self.formats, &report)
            .context("Failed to write results")?;
        debug!("Wrote {:?}", outputs);

        info!("Processing complete for {}", self.sample_name);
        Ok(ProcessingOutcome {
            run_id: self.run_id,
            verdict: classification.verdict,
            classification,
            outputs,
        })
    }

    fn run_metadata(
        &self,
        counts: &ValidatedInput,
        summary: &ValidatedInput,
        total_verified_reads: u64,
    ) -> RunMetadata {
        RunMetadata {
            run_id: self.run_id,
            processing_date: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            counts_file: counts.path.display().to_string(),
            counts_sha256: counts.hash_sha256.clone(),
            summary_file: summary.path.display().to_string(),
            summary_sha256: summary.hash_sha256.clone(),
            reference_dir: self.resource_dir.display().to_string(),
            total_verified_reads,
        }
    }
}

/// featureCounts writes its summary next to the table as `<table>.summary`
pub fn default_summary_path(counts_path: &Path) -> PathBuf {
    let mut name = OsString::from(counts_path.as_os_str());
    name.push(".summary");
    PathBuf::from(name)
}

/// Sample name from the counts file name, without `.gz` and the last extension
pub fn default_sample_name(counts_path: &Path) -> String {
    let name = counts_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}
