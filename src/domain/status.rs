//! The single mutable status document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::PipelineRun;

/// Current pipeline state as persisted by the status store and served to
/// the dashboard.
///
/// `last_run`, when present, equals the head of `recent_runs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// True strictly between trigger acceptance and run resolution
    #[serde(default)]
    pub is_running: bool,

    /// Most recently completed run
    #[serde(default)]
    pub last_run: Option<PipelineRun>,

    /// Completed runs, most recent first
    #[serde(default)]
    pub recent_runs: Vec<PipelineRun>,

    /// Next scheduled run (informational only)
    #[serde(default)]
    pub next_scheduled_at: Option<DateTime<Utc>>,
}

impl PipelineStatus {
    /// Copy of this document with a different running flag
    pub fn with_running(&self, is_running: bool) -> Self {
        Self {
            is_running,
            ..self.clone()
        }
    }

    /// Check the `last_run == recent_runs[0]` invariant
    pub fn is_consistent(&self) -> bool {
        match (&self.last_run, self.recent_runs.first()) {
            (Some(last), Some(head)) => last == head,
            (None, None) => true,
            // A last run with trimmed-away history is not produced by the
            // recorder, and neither is history without a last run.
            _ => false,
        }
    }
}
