//! Run lifecycle events for the append-only journal.
//!
//! The status document only keeps successful runs. The journal records
//! every trigger attempt, including rejections and failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the run journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// Lease of the trigger attempt this event belongs to
    pub lease_id: Option<Uuid>,

    /// Completed run id (only on `run_completed`)
    pub run_id: Option<Uuid>,

    /// Type of event
    pub event_type: RunEventType,

    /// Human-readable summary
    pub summary: String,

    /// Time from acquisition to resolution in milliseconds
    pub duration_ms: Option<u64>,

    /// Error message if failed or rejected
    pub error: Option<String>,
}

impl RunEvent {
    /// Create a new event with the current timestamp
    pub fn new(lease_id: Option<Uuid>, event_type: RunEventType, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            lease_id,
            run_id: None,
            event_type,
            summary: summary.into(),
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Types of journal events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    /// Trigger accepted, running flag set
    RunStarted,

    /// External pipeline finished and the run was recorded
    RunCompleted,

    /// External pipeline failed; history left untouched
    RunFailed,

    /// Trigger refused because a run was already in flight
    TriggerRejected,

    /// Operator cleared a stuck running flag by hand
    FlagReset,
}

impl std::fmt::Display for RunEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RunStarted => "started",
            Self::RunCompleted => "completed",
            Self::RunFailed => "failed",
            Self::TriggerRejected => "rejected",
            Self::FlagReset => "reset",
        };
        f.write_str(name)
    }
}
