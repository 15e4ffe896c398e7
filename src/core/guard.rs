//! Single-flight enforcement around pipeline execution.
//!
//! A successful [`RunGuard::try_acquire`] sets `is_running` and hands out
//! a [`Lease`]. The lease is consumed by [`RunGuard::release`], which
//! clears the flag in the same write that commits the run outcome.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::PipelineStatus;

use super::error::PipelineError;
use super::status_store::StatusStore;

/// The right to run the pipeline, held between acquisition and release
#[derive(Debug)]
#[must_use = "a lease must be released or the running flag stays set"]
pub struct Lease {
    id: Uuid,
    acquired_at: DateTime<Utc>,
    started: Instant,
}

impl Lease {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            acquired_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Milliseconds since acquisition
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Mediates every transition of the running flag
pub struct RunGuard {
    store: Arc<dyn StatusStore>,

    /// Serializes read-modify-write sections within this process
    transition: Mutex<()>,
}

impl RunGuard {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self {
            store,
            transition: Mutex::new(()),
        }
    }

    /// The underlying status store
    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Claim the single run slot.
    ///
    /// Fails with [`PipelineError::AlreadyRunning`] without writing anything
    /// if a run is in flight. Otherwise sets `is_running`, preserving every
    /// other field.
    pub async fn try_acquire(&self) -> Result<Lease, PipelineError> {
        let _transition = self.transition.lock().await;

        let current = self.store.read().await?;
        if current.is_running {
            return Err(PipelineError::AlreadyRunning);
        }

        self.store.write(&current.with_running(true)).await?;

        let lease = Lease::new();
        debug!(lease_id = %lease.id, "Run slot acquired");
        Ok(lease)
    }

    /// Give the slot back.
    ///
    /// `commit` builds the next document from a fresh read; the guard then
    /// forces `is_running = false` and writes the result. Pass an identity
    /// closure to leave history untouched.
    pub async fn release<F>(&self, lease: Lease, commit: F) -> Result<PipelineStatus, PipelineError>
    where
        F: FnOnce(PipelineStatus) -> PipelineStatus + Send,
    {
        let _transition = self.transition.lock().await;

        let current = self.store.read().await?;
        let mut next = commit(current);
        next.is_running = false;
        self.store.write(&next).await?;

        debug!(lease_id = %lease.id, held_ms = lease.elapsed_ms(), "Run slot released");
        Ok(next)
    }

    /// Clear the running flag without a lease.
    ///
    /// Manual recovery for a flag left set by a crashed process. Returns
    /// whether the flag was set.
    pub async fn force_release(&self) -> Result<bool, PipelineError> {
        let _transition = self.transition.lock().await;

        let current = self.store.read().await?;
        if !current.is_running {
            return Ok(false);
        }

        self.store.write(&current.with_running(false)).await?;
        warn!("Running flag cleared without a lease");
        Ok(true)
    }
}
