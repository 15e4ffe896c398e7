//! Core run orchestration.
//!
//! This module contains:
//! - StatusStore: persistence of the status document
//! - RunGuard: single-flight acquisition and release
//! - RunRecorder: bounded run history
//! - PipelineGateway: the trigger entry point
//! - RunJournal, DailySchedule, StatusProjection: supporting pieces

pub mod error;
pub mod gateway;
pub mod guard;
pub mod journal;
pub mod projection;
pub mod recorder;
pub mod schedule;
pub mod status_store;

// Re-export commonly used types
pub use error::PipelineError;
pub use gateway::PipelineGateway;
pub use guard::{Lease, RunGuard};
pub use journal::RunJournal;
pub use projection::{StageLabel, StatusProjection};
pub use recorder::{RunRecorder, DEFAULT_MAX_HISTORY};
pub use schedule::DailySchedule;
pub use status_store::{FileStatusStore, MemoryStatusStore, StatusStore};
