//! Per-run report of completed, skipped and failed work.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CheckpointError;

pub const REPORT_FILE: &str = "run_report.json";

/// What happened to a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Completed,
    /// Already complete in the checkpoint.
    Skipped,
    Failed,
}

/// One line of the report. `model` and `token` are absent for
/// manufacturer-level entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub kind: ReportKind,
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Error kind (`transition_failure`, ...) for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
            entries: Vec::new(),
        }
    }

    pub fn completed(&mut self, manufacturer: &str, model: &str, token: &str) {
        self.push(ReportKind::Completed, manufacturer, Some(model), Some(token), None, None);
    }

    pub fn skipped(&mut self, manufacturer: &str, model: &str, token: &str) {
        self.push(ReportKind::Skipped, manufacturer, Some(model), Some(token), None, None);
    }

    /// Record a failure at whatever granularity it was contained.
    pub fn failed(
        &mut self,
        manufacturer: &str,
        model: Option<&str>,
        token: Option<&str>,
        error_kind: &str,
        reason: impl Into<String>,
    ) {
        self.push(
            ReportKind::Failed,
            manufacturer,
            model,
            token,
            Some(error_kind.to_string()),
            Some(reason.into()),
        );
    }

    fn push(
        &mut self,
        kind: ReportKind,
        manufacturer: &str,
        model: Option<&str>,
        token: Option<&str>,
        error_kind: Option<String>,
        reason: Option<String>,
    ) {
        self.entries.push(ReportEntry {
            kind,
            manufacturer: manufacturer.to_string(),
            model: model.map(str::to_string),
            token: token.map(str::to_string),
            error_kind,
            reason,
        });
    }

    /// Append another report's entries (e.g. one per manufacturer task).
    pub fn absorb(&mut self, other: RunReport) {
        self.entries.extend(other.entries);
    }

    pub fn count(&self, kind: ReportKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.kind == ReportKind::Failed)
    }

    pub fn finish(&mut self, cancelled: bool) {
        self.finished_at = Some(Utc::now());
        self.cancelled = cancelled;
    }

    /// Log a summary plus one line per failure.
    pub fn log_summary(&self) {
        info!(
            "Run {} finished: {} completed, {} skipped, {} failed{}",
            self.run_id,
            self.count(ReportKind::Completed),
            self.count(ReportKind::Skipped),
            self.count(ReportKind::Failed),
            if self.cancelled { " (cancelled)" } else { "" }
        );
        for entry in self.failures() {
            warn!(
                "Failed: {} / {} / {} [{}] {}",
                entry.manufacturer,
                entry.model.as_deref().unwrap_or("-"),
                entry.token.as_deref().unwrap_or("-"),
                entry.error_kind.as_deref().unwrap_or("unknown"),
                entry.reason.as_deref().unwrap_or("")
            );
        }
    }

    /// Write the report into `dir` as `run_report.json`.
    pub async fn write(&self, dir: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(dir).await?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        fs::write(dir.join(REPORT_FILE), content).await?;
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
