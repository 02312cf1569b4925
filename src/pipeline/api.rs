// src/pipeline/api.rs
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

/// Terminal state of one processed row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum RowStatus {
    /// The row's document reached the destination directory.
    Completed { artifact: PathBuf },
    /// The row failed during generation or conversion; the rest of the
    /// batch was unaffected.
    Failed { cause: String },
}

/// Per-row outcome, consumed by the progress log and the final summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// The row's identity for reporting: its first column's resolved
    /// value (or `row-N` when that value cannot be resolved).
    pub key: String,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl GenerationResult {
    pub fn completed(key: impl Into<String>, artifact: PathBuf) -> Self {
        Self { key: key.into(), status: RowStatus::Completed { artifact } }
    }

    pub fn failed(key: impl Into<String>, cause: impl Display) -> Self {
        Self { key: key.into(), status: RowStatus::Failed { cause: cause.to_string() } }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RowStatus::Failed { .. })
    }
}

/// Aggregate outcome of one batch run.
///
/// A batch always runs to completion: failed rows are counted here, never
/// turned into an error by the pipeline itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Rows taken from the data source.
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
    /// ISO 8601 timestamp of when the batch started.
    pub started_at: String,
    /// Total wall-clock time of the batch.
    pub elapsed: Duration,
    /// Per-row results in data-source order.
    pub results: Vec<GenerationResult>,
}
