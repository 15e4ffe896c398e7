//! Domain types for the shorts pipeline orchestrator.
//!
//! This module contains the core data structures:
//! - Run: completed runs and the reports they are built from
//! - Status: the persisted status document
//! - Events: journal entries for every trigger attempt

pub mod events;
pub mod run;
pub mod status;

// Re-export commonly used types
pub use events::{RunEvent, RunEventType};
pub use run::{PipelineRun, RunReport};
pub use status::PipelineStatus;
