// ==============================================================================
// main.rs - Ig Purity Checker Entry Point
// ==============================================================================
// Description: Command-line entry point for single-sample Ig clonality analysis
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use purity_checker::config::AnalyzerConfig;
use purity_checker::output::OutputFormat;
use purity_checker::processor::{default_sample_name, default_summary_path, PurityProcessor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// featureCounts gene count table (plain or gzipped)
    #[arg(short, long)]
    counts: PathBuf,

    /// featureCounts summary (defaults to <counts>.summary)
    #[arg(short, long)]
    summary: Option<PathBuf>,

    /// Directory holding the reference gene lists
    #[arg(short, long, env = "PURITY_RESOURCE_DIR", default_value = ".")]
    resource_dir: PathBuf,

    /// Directory results are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Sample name prefixed to every output file (defaults to the counts file stem)
    #[arg(short = 'n', long)]
    sample_name: Option<String>,

    /// Output formats: tsv, json, sqlite (tsv is always written)
    #[arg(short, long, value_delimiter = ',', default_value = "tsv")]
    formats: Vec<OutputFormat>,

    /// JSON file overriding classifier thresholds and gene list names
    #[arg(long, env = "PURITY_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purity_checker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Ig Purity Checker starting...");

    // Parse command line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_path(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AnalyzerConfig::default(),
    };

    let summary = args
        .summary
        .clone()
        .unwrap_or_else(|| default_summary_path(&args.counts));
    let sample_name = args
        .sample_name
        .clone()
        .unwrap_or_else(|| default_sample_name(&args.counts));
    if sample_name.is_empty() {
        anyhow::bail!("Could not derive a sample name from {:?}; pass --sample-name", args.counts);
    }

    let processor = PurityProcessor::new(
        sample_name.clone(),
        args.counts,
        summary,
        args.resource_dir,
        args.output_dir,
        config,
    )
    .with_formats(args.formats);

    match processor.process() {
        Ok(outcome) => {
            info!(
                "Sample {}: {} (run {})",
                sample_name,
                outcome.verdict.label(),
                outcome.run_id
            );
            println!("{}\t{}", sample_name, outcome.verdict.label());
            Ok(())
        }
        Err(e) => {
            warn!("Processing failed: {:#}", e);
            Err(e)
        }
    }
}
