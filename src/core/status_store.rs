//! Durable storage for the single pipeline status document.
//!
//! The store offers whole-document read and replace only. Callers build
//! the next state from a fresh read; there is no merge and no
//! compare-and-swap.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::PipelineStatus;

use super::error::PipelineError;

/// File name of the persisted document inside the home directory
pub const STATUS_FILE: &str = "pipeline-status.json";

/// Lock file guarding replacement of the status document
pub const LOCK_FILE: &str = "pipeline-status.lock";

/// Read/replace persistence for [`PipelineStatus`]
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Current document, or the default document if none was written yet
    async fn read(&self) -> Result<PipelineStatus, PipelineError>;

    /// Replace the persisted document
    async fn write(&self, status: &PipelineStatus) -> Result<(), PipelineError>;
}

/// JSON file store
pub struct FileStatusStore {
    /// Path to the status document
    path: PathBuf,

    /// Path to the lock file taken while replacing
    lock_path: PathBuf,
}

impl FileStatusStore {
    /// Store the document inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            path: dir.join(STATUS_FILE),
            lock_path: dir.join(LOCK_FILE),
        }
    }

    /// Path to the status document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<PipelineStatus> {
        if !self.path.exists() {
            return Ok(PipelineStatus::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read status file: {}", self.path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse status file: {}", self.path.display()))
    }

    async fn store(&self, status: &PipelineStatus) -> Result<()> {
        let json = serde_json::to_vec_pretty(status).context("Failed to serialize status")?;
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || replace_file(&path, &lock_path, &json))
            .await
            .context("Status write task failed")?
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn read(&self) -> Result<PipelineStatus, PipelineError> {
        self.load()
            .await
            .map_err(|e| PipelineError::store_unavailable(&e))
    }

    async fn write(&self, status: &PipelineStatus) -> Result<(), PipelineError> {
        self.store(status)
            .await
            .map_err(|e| PipelineError::store_unavailable(&e))
    }
}

/// Atomically replace `path` with `contents` while holding an exclusive lock
fn replace_file(path: &Path, lock_path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
    lock.lock_exclusive()
        .context("Failed to acquire lock on status file")?;

    let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temporary status file")?;
    tmp.write_all(contents)
        .context("Failed to write temporary status file")?;
    tmp.as_file()
        .sync_all()
        .context("Failed to sync temporary status file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace status file: {}", path.display()))?;

    FileExt::unlock(&lock).context("Failed to release lock on status file")?;
    Ok(())
}

/// In-memory store with the same contract as the file store
#[derive(Default)]
pub struct MemoryStatusStore {
    status: Mutex<PipelineStatus>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document
    pub fn with_status(status: PipelineStatus) -> Self {
        Self {
            status: Mutex::new(status),
            ..Default::default()
        }
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent read and write fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PipelineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PipelineError::StoreUnavailable {
                message: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn read(&self) -> Result<PipelineStatus, PipelineError> {
        self.check_available()?;
        Ok(self.status.lock().await.clone())
    }

    async fn write(&self, status: &PipelineStatus) -> Result<(), PipelineError> {
        self.check_available()?;
        *self.status.lock().await = status.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
