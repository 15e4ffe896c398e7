//! shorts-factory - Run orchestration for the shorts content pipeline
//!
//! Gates execution of the external discovery/editing/publishing job and
//! keeps a durable status document for the monitoring dashboard.
//!
//! # Architecture
//!
//! - At most one run is in flight; concurrent triggers are rejected, not queued
//! - The status document is replaced whole on every transition
//! - Successful runs enter a bounded history; failed runs only clear the
//!   running flag and are recorded in the journal
//!
//! # Modules
//!
//! - `adapters`: The external pipeline operation (subprocess runner)
//! - `core`: Status store, run guard, recorder, gateway
//! - `domain`: Data structures (PipelineRun, PipelineStatus, RunEvent)
//! - `server`: HTTP API for the dashboard
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the dashboard API
//! shorts-factory serve
//!
//! # Run the pipeline once
//! shorts-factory trigger
//!
//! # Check status
//! shorts-factory status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use adapters::{CommandRunner, PipelineRunner};
pub use crate::core::{PipelineError, PipelineGateway, RunGuard, RunRecorder, StatusStore};
pub use domain::{PipelineRun, PipelineStatus, RunReport};
