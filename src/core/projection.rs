//! Read-only view of the status document for display.

use serde::Serialize;

use crate::domain::{PipelineRun, PipelineStatus};

use super::schedule::DailySchedule;

/// Label for the discovery/editing/publishing stage cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageLabel {
    Synced,
    Pending,
    Optimized,
    Queued,
    Live,
    Awaiting,
}

impl std::fmt::Display for StageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Synced => "Synced",
            Self::Pending => "Pending",
            Self::Optimized => "Optimized",
            Self::Queued => "Queued",
            Self::Live => "Live",
            Self::Awaiting => "Awaiting",
        };
        f.write_str(label)
    }
}

/// Display fields derived from a [`PipelineStatus`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusProjection {
    pub is_running: bool,
    pub control_label: String,
    pub sources_processed: u32,
    pub shorts_published: u32,
    pub next_schedule_text: String,
    pub discovery: StageLabel,
    pub editing: StageLabel,
    pub publishing: StageLabel,
    pub discovery_details: String,
    pub analytics_details: String,
    pub recent_runs: usize,
}

impl StatusProjection {
    /// `schedule` is the configured hint, shown until a run stamps a concrete time
    pub fn from_status(status: &PipelineStatus, schedule: Option<DailySchedule>) -> Self {
        let last_run = status.last_run.as_ref();
        let published = last_run.map(|r| r.shorts_published).unwrap_or(0);

        let next_schedule_text = match status.next_scheduled_at {
            Some(at) => at.format("%b %-d, %Y %H:%M UTC").to_string(),
            None => match schedule {
                Some(schedule) => schedule.to_string(),
                None => "Not scheduled".to_string(),
            },
        };

        Self {
            is_running: status.is_running,
            control_label: if status.is_running {
                "Running…".to_string()
            } else {
                "Run Pipeline".to_string()
            },
            sources_processed: last_run.map(|r| r.sources_processed).unwrap_or(0),
            shorts_published: published,
            next_schedule_text,
            discovery: if last_run.is_some() {
                StageLabel::Synced
            } else {
                StageLabel::Pending
            },
            editing: if published > 0 {
                StageLabel::Optimized
            } else {
                StageLabel::Queued
            },
            publishing: if published > 0 {
                StageLabel::Live
            } else {
                StageLabel::Awaiting
            },
            discovery_details: last_run
                .map(|r| r.summary.clone())
                .unwrap_or_else(|| "No runs yet".to_string()),
            analytics_details: format!(
                "Analytics log: {}",
                last_run
                    .and_then(|r| r.analytics_path.as_deref())
                    .unwrap_or("n/a")
            ),
            recent_runs: status.recent_runs.len(),
        }
    }
}

/// One-line description of a run for listings
pub fn run_line(run: &PipelineRun) -> String {
    format!(
        "{}  {:>4} sources  {:>3} shorts  {}",
        run.completed_at.format("%Y-%m-%d %H:%M"),
        run.sources_processed,
        run.shorts_published,
        run.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunReport;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_status() {
        let view = StatusProjection::from_status(&PipelineStatus::default(), Some(DailySchedule::default()));

        assert_eq!(view.control_label, "Run Pipeline");
        assert_eq!(view.sources_processed, 0);
        assert_eq!(view.next_schedule_text, "Daily at 12:00 UTC");
        assert_eq!(view.discovery, StageLabel::Pending);
        assert_eq!(view.editing, StageLabel::Queued);
        assert_eq!(view.publishing, StageLabel::Awaiting);
        assert_eq!(view.discovery_details, "No runs yet");
        assert_eq!(view.analytics_details, "Analytics log: n/a");
    }

    #[test]
    fn test_published_run() {
        let run = PipelineRun::from_report(
            RunReport::new(12, 3, "Processed 12 sources").with_analytics_path("data/a.json"),
        );
        let status = PipelineStatus {
            is_running: true,
            last_run: Some(run.clone()),
            recent_runs: vec![run],
            next_scheduled_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()),
        };

        let view = StatusProjection::from_status(&status, None);
        assert_eq!(view.control_label, "Running…");
        assert_eq!(view.sources_processed, 12);
        assert_eq!(view.shorts_published, 3);
        assert_eq!(view.next_schedule_text, "Mar 10, 2024 12:00 UTC");
        assert_eq!(view.discovery, StageLabel::Synced);
        assert_eq!(view.editing, StageLabel::Optimized);
        assert_eq!(view.publishing, StageLabel::Live);
        assert_eq!(view.discovery_details, "Processed 12 sources");
        assert_eq!(view.analytics_details, "Analytics log: data/a.json");
    }

    #[test]
    fn test_run_without_uploads() {
        let run = PipelineRun::from_report(RunReport::new(5, 0, "nothing uploaded"));
        let status = PipelineStatus {
            last_run: Some(run.clone()),
            recent_runs: vec![run],
            ..Default::default()
        };

        let view = StatusProjection::from_status(&status, None);
        assert_eq!(view.discovery, StageLabel::Synced);
        assert_eq!(view.editing, StageLabel::Queued);
        assert_eq!(view.publishing, StageLabel::Awaiting);
    }

    #[test]
    fn test_schedule_text_follows_configuration() {
        let status = PipelineStatus::default();

        let custom = "06:30".parse::<DailySchedule>().unwrap();
        let view = StatusProjection::from_status(&status, Some(custom));
        assert_eq!(view.next_schedule_text, "Daily at 06:30 UTC");

        let view = StatusProjection::from_status(&status, None);
        assert_eq!(view.next_schedule_text, "Not scheduled");
    }
}
