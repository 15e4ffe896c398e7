//! Folds completed runs into the status document's bounded history.

use crate::domain::{PipelineRun, PipelineStatus};

/// Default number of runs kept in `recent_runs`
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Turns a successful run into the next status document
#[derive(Debug, Clone, Copy)]
pub struct RunRecorder {
    max_history: usize,
}

impl Default for RunRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl RunRecorder {
    /// Keep at most `max_history` runs (at least one)
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Prepend `run` to the history and make it the last run.
    ///
    /// `is_running` and `next_scheduled_at` are carried over from `current`;
    /// clearing the flag is the guard's job.
    pub fn record(&self, current: PipelineStatus, run: PipelineRun) -> PipelineStatus {
        let mut recent_runs = Vec::with_capacity(self.max_history);
        recent_runs.push(run.clone());
        recent_runs.extend(current.recent_runs.into_iter().take(self.max_history - 1));

        PipelineStatus {
            is_running: current.is_running,
            last_run: Some(run),
            recent_runs,
            next_scheduled_at: current.next_scheduled_at,
        }
    }
}
