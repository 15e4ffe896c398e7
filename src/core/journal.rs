//! Append-only run journal with file-based persistence.
//!
//! Events are stored as newline-delimited JSON (JSONL) for simplicity
//! and easy debugging/inspection.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::{RunEvent, RunEventType};

/// File name of the journal inside the home directory
pub const JOURNAL_FILE: &str = "runs.jsonl";

/// File-based run journal using JSONL format
pub struct RunJournal {
    /// Path to the runs.jsonl file
    path: PathBuf,
}

impl RunJournal {
    /// Journal stored inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(JOURNAL_FILE),
        }
    }

    /// Open the journal in the configured home directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::in_dir(crate::config::state_dir()?))
    }

    /// Get the path to the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event to the log
    pub async fn append(&self, event: &RunEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create journal directory: {}", parent.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open journal: {}", self.path.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize run event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write run event")?;
        file.flush().await.context("Failed to flush run event")?;

        Ok(())
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<RunEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open journal: {}", self.path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: RunEvent = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse run event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// The most recent `limit` events, newest first.
    ///
    /// Only the last `limit` lines are held in memory and parsed.
    pub async fn tail(&self, limit: usize) -> Result<Vec<RunEvent>> {
        if limit == 0 || !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .await
            .with_context(|| format!("Failed to open journal: {}", self.path.display()))?;

        let mut lines = BufReader::new(file).lines();
        let mut window: VecDeque<String> = VecDeque::with_capacity(limit);

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(line);
        }

        window
            .iter()
            .rev()
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse run event: {}", line))
            })
            .collect()
    }

    /// Get the last event of a specific type
    pub async fn last_event_of_type(&self, event_type: RunEventType) -> Result<Option<RunEvent>> {
        let events = self.replay().await?;
        Ok(events.into_iter().rev().find(|e| e.event_type == event_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_append_and_replay() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(temp.path());
        let lease = Uuid::new_v4();

        journal
            .append(&RunEvent::new(Some(lease), RunEventType::RunStarted, "Run started"))
            .await
            .unwrap();
        journal
            .append(
                &RunEvent::new(Some(lease), RunEventType::RunFailed, "Run failed")
                    .with_error("upload quota exceeded"),
            )
            .await
            .unwrap();

        let events = journal.replay().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, RunEventType::RunStarted);
        assert_eq!(events[1].event_type, RunEventType::RunFailed);
        assert_eq!(events[1].lease_id, Some(lease));
    }

    #[tokio::test]
    async fn test_missing_journal_is_empty() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(temp.path().join("never-written"));

        assert!(journal.replay().await.unwrap().is_empty());
        assert!(journal.tail(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tail_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(temp.path());

        for i in 0..5 {
            journal
                .append(&RunEvent::new(None, RunEventType::TriggerRejected, format!("attempt {}", i)))
                .await
                .unwrap();
        }

        let tail = journal.tail(2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].summary, "attempt 4");
        assert_eq!(tail[1].summary, "attempt 3");
    }

    #[tokio::test]
    async fn test_last_event_of_type() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(temp.path());
        let run_id = Uuid::new_v4();

        journal
            .append(&RunEvent::new(None, RunEventType::RunCompleted, "first").with_run_id(Uuid::new_v4()))
            .await
            .unwrap();
        journal
            .append(&RunEvent::new(None, RunEventType::RunCompleted, "second").with_run_id(run_id))
            .await
            .unwrap();
        journal
            .append(&RunEvent::new(None, RunEventType::RunFailed, "third"))
            .await
            .unwrap();

        let last = journal
            .last_event_of_type(RunEventType::RunCompleted)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.run_id, Some(run_id));
    }

    #[tokio::test]
    async fn test_tail_only_parses_recent_lines() {
        let temp = TempDir::new().unwrap();
        let journal = RunJournal::in_dir(temp.path());
        std::fs::write(journal.path(), "{truncated line from an old crash\n").unwrap();

        for i in 0..3 {
            journal
                .append(&RunEvent::new(None, RunEventType::TriggerRejected, format!("attempt {}", i)))
                .await
                .unwrap();
        }

        let tail = journal.tail(3).await.unwrap();
        let summaries: Vec<&str> = tail.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["attempt 2", "attempt 1", "attempt 0"]);
        assert!(journal.tail(0).await.unwrap().is_empty());
        assert!(journal.replay().await.is_err());
    }
}
