// ==============================================================================
// audit.rs - Audit Logging for Analysis Runs
// ==============================================================================
// Description: Append-only JSON-lines audit trail for each analysis run
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    RunStarted,
    InputValidated,
    RunCompleted,
    RunFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub event: AuditEventType,
    pub severity: LogSeverity,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(run_id: Uuid, event: AuditEventType, details: serde_json::Value) -> Self {
        let severity = match event {
            AuditEventType::RunFailed => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        Self {
            timestamp: Utc::now(),
            run_id,
            event,
            severity,
            details,
        }
    }
}

/// JSON-lines audit file for one sample
pub struct AuditLog {
    run_id: Uuid,
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Open (or create) `{output_dir}/{sample}.audit.jsonl` for appending
    pub fn open(output_dir: &Path, sample_name: &str, run_id: Uuid) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

        Self::open_path(&output_dir.join(format!("{}.audit.jsonl", sample_name)), run_id)
    }

    /// Open (or create) an audit file at an explicit path for appending
    pub fn open_path(path: &Path, run_id: Uuid) -> Result<Self> {
        let path = path.to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log {:?}", path))?;

        Ok(Self { run_id, path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, event: AuditEventType, details: serde_json::Value) -> Result<()> {
        let event = AuditEvent::new(self.run_id, event, details);
        let line = serde_json::to_string(&event).context("Failed to serialize audit event")?;

        writeln!(self.file, "{}", line).context("Failed to write audit event")?;
        self.file.flush().context("Failed to flush audit log")?;

        Ok(())
    }
}
