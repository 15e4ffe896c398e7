//! Error taxonomy for triggering and tracking runs.

use thiserror::Error;

/// Errors surfaced by the run guard, status store and gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A run is already in flight; the trigger was rejected, not queued
    #[error("Pipeline is already running")]
    AlreadyRunning,

    /// The external pipeline operation failed. Displays the underlying
    /// message unchanged.
    #[error("{message}")]
    PipelineExecutionFailed { message: String },

    /// The status store could not be read or written
    #[error("Status store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl PipelineError {
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::PipelineExecutionFailed {
            message: message.into(),
        }
    }

    /// Wrap a storage fault, keeping the whole context chain
    pub fn store_unavailable(error: &anyhow::Error) -> Self {
        Self::StoreUnavailable {
            message: format!("{:#}", error),
        }
    }

    /// True for the expected concurrent-trigger outcome
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}
