//! Adapter interfaces for the external pipeline.
//!
//! Discovery, editing and publishing happen outside this crate. The
//! gateway only sees a single async operation that either produces a
//! [`RunReport`] or fails.

pub mod command;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::RunReport;

// Re-export the subprocess runner
pub use command::CommandRunner;

/// Trait for the external pipeline operation
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Execute one full pipeline pass
    async fn run(&self) -> Result<RunReport>;
}
