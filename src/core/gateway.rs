//! Entry point for triggering pipeline runs.
//!
//! Ties the run guard, the run recorder and the external pipeline
//! together:
//!
//! ```text
//! Idle -> Acquiring -> Running -> Completing -> Idle
//!             |                \-> Failing ---> Idle
//!             \-> rejected (AlreadyRunning), nothing written
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn, Instrument, Span};

use crate::adapters::PipelineRunner;
use crate::domain::{PipelineRun, PipelineStatus, RunEvent, RunEventType, RunReport};

use super::error::PipelineError;
use super::guard::{Lease, RunGuard};
use super::journal::RunJournal;
use super::recorder::RunRecorder;
use super::schedule::DailySchedule;
use super::status_store::StatusStore;

/// The façade used by the HTTP and CLI layers
#[derive(Clone)]
pub struct PipelineGateway {
    guard: Arc<RunGuard>,
    recorder: RunRecorder,
    runner: Arc<dyn PipelineRunner>,
    journal: Option<Arc<RunJournal>>,
    schedule: Option<DailySchedule>,
}

impl PipelineGateway {
    /// Gateway with default history length, no journal and no schedule hint
    pub fn new(store: Arc<dyn StatusStore>, runner: Arc<dyn PipelineRunner>) -> Self {
        Self {
            guard: Arc::new(RunGuard::new(store)),
            recorder: RunRecorder::default(),
            runner,
            journal: None,
            schedule: None,
        }
    }

    pub fn with_recorder(mut self, recorder: RunRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_journal(mut self, journal: RunJournal) -> Self {
        self.journal = Some(Arc::new(journal));
        self
    }

    pub fn with_schedule(mut self, schedule: DailySchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Current status document
    pub async fn status(&self) -> Result<PipelineStatus, PipelineError> {
        self.guard.store().read().await
    }

    /// Run the pipeline once.
    ///
    /// Rejects immediately with [`PipelineError::AlreadyRunning`] if a run
    /// is in flight. Once accepted the run is carried to completion on its
    /// own task, so dropping the returned future does not leave the
    /// running flag set.
    #[instrument(skip(self), fields(runner = %self.runner.name()))]
    pub async fn trigger(&self) -> Result<PipelineRun, PipelineError> {
        let lease = match self.guard.try_acquire().await {
            Ok(lease) => lease,
            Err(err) => {
                if err.is_rejection() {
                    info!("Trigger rejected, a run is already in flight");
                    self.record_event(
                        RunEvent::new(None, RunEventType::TriggerRejected, "Trigger rejected")
                            .with_error(err.to_string()),
                    )
                    .await;
                } else {
                    error!(error = %err, "Failed to acquire run slot");
                }
                return Err(err);
            }
        };

        info!(lease_id = %lease.id(), "Pipeline run accepted");

        // No await between acquiring and detaching, or a dropped caller
        // could strand the lease.
        let gateway = self.clone();
        tokio::spawn(async move { gateway.execute(lease).await }.instrument(Span::current()))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Run task aborted before resolving");
                Err(PipelineError::execution_failed(format!("run task aborted: {}", e)))
            })
    }

    /// Clear a stuck running flag. Returns whether it was set.
    pub async fn reset(&self) -> Result<bool, PipelineError> {
        let cleared = self.guard.force_release().await?;
        if cleared {
            self.record_event(RunEvent::new(
                None,
                RunEventType::FlagReset,
                "Running flag cleared by operator",
            ))
            .await;
        }
        Ok(cleared)
    }

    async fn execute(&self, lease: Lease) -> Result<PipelineRun, PipelineError> {
        let mut started = RunEvent::new(
            Some(lease.id()),
            RunEventType::RunStarted,
            "Pipeline run started",
        );
        started.timestamp = lease.acquired_at();
        self.record_event(started).await;

        let runner = Arc::clone(&self.runner);
        let outcome = tokio::spawn(async move { runner.run().await }.instrument(Span::current())).await;

        match outcome {
            Ok(Ok(report)) => self.complete(lease, report).await,
            Ok(Err(e)) => self.fail(lease, format!("{:#}", e)).await,
            Err(e) if e.is_panic() => self.fail(lease, "pipeline task panicked".to_string()).await,
            Err(e) => self.fail(lease, e.to_string()).await,
        }
    }

    async fn complete(&self, lease: Lease, report: RunReport) -> Result<PipelineRun, PipelineError> {
        let run = PipelineRun::from_report(report);
        let lease_id = lease.id();
        let duration_ms = lease.elapsed_ms();

        let recorder = self.recorder;
        let schedule = self.schedule;
        let recorded = run.clone();
        let released = self
            .guard
            .release(lease, move |current| {
                stamp_schedule(schedule, recorder.record(current, recorded))
            })
            .await;

        if let Err(err) = released {
            error!(%lease_id, run_id = %run.id, error = %err, "Run finished but could not be recorded");
            self.record_event(
                RunEvent::new(Some(lease_id), RunEventType::RunFailed, "Run finished but was not recorded")
                    .with_run_id(run.id)
                    .with_duration(duration_ms)
                    .with_error(err.to_string()),
            )
            .await;
            return Err(err);
        }

        info!(
            %lease_id,
            run_id = %run.id,
            sources_processed = run.sources_processed,
            shorts_published = run.shorts_published,
            duration_ms,
            "Pipeline run completed"
        );
        self.record_event(
            RunEvent::new(Some(lease_id), RunEventType::RunCompleted, run.summary.clone())
                .with_run_id(run.id)
                .with_duration(duration_ms),
        )
        .await;

        Ok(run)
    }

    async fn fail(&self, lease: Lease, message: String) -> Result<PipelineRun, PipelineError> {
        let lease_id = lease.id();
        let duration_ms = lease.elapsed_ms();
        warn!(%lease_id, error = %message, duration_ms, "Pipeline run failed");

        // History and schedule hint stay as they were; only the flag clears
        if let Err(err) = self.guard.release(lease, |current| current).await
        {
            error!(%lease_id, error = %err, "Could not clear running flag after failed run");
            return Err(err);
        }

        self.record_event(
            RunEvent::new(Some(lease_id), RunEventType::RunFailed, "Pipeline run failed")
                .with_duration(duration_ms)
                .with_error(message.clone()),
        )
        .await;

        Err(PipelineError::execution_failed(message))
    }

    /// Journal writes never change a trigger's outcome
    async fn record_event(&self, event: RunEvent) {
        if let Some(ref journal) = self.journal {
            if let Err(e) = journal.append(&event).await {
                warn!(error = %e, event_type = %event.event_type, "Failed to append run event");
            }
        }
    }
}

fn stamp_schedule(schedule: Option<DailySchedule>, mut status: PipelineStatus) -> PipelineStatus {
    if let Some(schedule) = schedule {
        status.next_scheduled_at = Some(schedule.next_after(Utc::now()));
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status_store::MemoryStatusStore;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedRunner(Result<RunReport, String>);

    #[async_trait]
    impl PipelineRunner for FixedRunner {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn run(&self) -> anyhow::Result<RunReport> {
            self.0.clone().map_err(|message| anyhow::anyhow!(message))
        }
    }

    struct PanickingRunner;

    #[async_trait]
    impl PipelineRunner for PanickingRunner {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn run(&self) -> anyhow::Result<RunReport> {
            panic!("renderer crashed");
        }
    }

    #[tokio::test]
    async fn test_success_records_run() {
        let store = Arc::new(MemoryStatusStore::new());
        let runner = Arc::new(FixedRunner(Ok(RunReport::new(12, 3, "done"))));
        let gateway = PipelineGateway::new(store.clone(), runner);

        let run = gateway.trigger().await.unwrap();

        let status = store.read().await.unwrap();
        assert!(!status.is_running);
        assert_eq!(status.last_run, Some(run.clone()));
        assert_eq!(status.recent_runs, vec![run]);
    }

    #[tokio::test]
    async fn test_failure_leaves_history_alone() {
        let store = Arc::new(MemoryStatusStore::new());
        let runner = Arc::new(FixedRunner(Err("upload quota exceeded".to_string())));
        let gateway = PipelineGateway::new(store.clone(), runner);

        let err = gateway.trigger().await.unwrap_err();
        assert_eq!(err, PipelineError::execution_failed("upload quota exceeded"));

        let status = store.read().await.unwrap();
        assert_eq!(status, PipelineStatus::default());
    }

    #[tokio::test]
    async fn test_panic_clears_flag() {
        let store = Arc::new(MemoryStatusStore::new());
        let gateway = PipelineGateway::new(store.clone(), Arc::new(PanickingRunner));

        let err = gateway.trigger().await.unwrap_err();
        assert_eq!(err, PipelineError::execution_failed("pipeline task panicked"));
        assert!(!store.read().await.unwrap().is_running);
    }

    #[tokio::test]
    async fn test_schedule_hint_written_on_success() {
        let store = Arc::new(MemoryStatusStore::new());
        let runner = Arc::new(FixedRunner(Ok(RunReport::default())));
        let gateway = PipelineGateway::new(store.clone(), runner).with_schedule(DailySchedule::default());

        let before = Utc::now();
        gateway.trigger().await.unwrap();

        let next = store.read().await.unwrap().next_scheduled_at.unwrap();
        assert!(next > before);
        assert!(next <= before + chrono::Duration::days(1));
    }

    #[tokio::test]
    async fn test_failure_only_clears_flag_with_schedule() {
        let prior = PipelineRun::from_report(RunReport::new(4, 1, "earlier run"));
        let seeded = PipelineStatus {
            is_running: false,
            last_run: Some(prior.clone()),
            recent_runs: vec![prior],
            next_scheduled_at: Some(Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()),
        };
        let store = Arc::new(MemoryStatusStore::with_status(seeded.clone()));
        let runner = Arc::new(FixedRunner(Err("upload quota exceeded".to_string())));
        let gateway = PipelineGateway::new(store.clone(), runner).with_schedule(DailySchedule::default());

        let err = gateway.trigger().await.unwrap_err();
        assert_eq!(err, PipelineError::execution_failed("upload quota exceeded"));
        assert_eq!(store.read().await.unwrap(), seeded.with_running(false));
    }

    #[tokio::test]
    async fn test_store_down_before_acquire() {
        let store = Arc::new(MemoryStatusStore::new());
        store.set_unavailable(true);
        let runner = Arc::new(FixedRunner(Ok(RunReport::default())));
        let gateway = PipelineGateway::new(store, runner);

        let err = gateway.trigger().await.unwrap_err();
        assert!(matches!(err, PipelineError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_reset_clears_stuck_flag() {
        let store = Arc::new(MemoryStatusStore::with_status(
            PipelineStatus::default().with_running(true),
        ));
        let runner = Arc::new(FixedRunner(Ok(RunReport::default())));
        let gateway = PipelineGateway::new(store.clone(), runner);

        assert_eq!(gateway.trigger().await.unwrap_err(), PipelineError::AlreadyRunning);
        assert!(gateway.reset().await.unwrap());
        assert!(gateway.trigger().await.is_ok());
    }
}
