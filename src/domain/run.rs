//! Completed pipeline runs.
//!
//! A `PipelineRun` is created exactly once, when the external pipeline
//! operation finishes successfully, and is never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable record of one completed pipeline execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    /// Unique identifier, assigned at completion
    pub id: Uuid,

    /// When the run completed (ISO 8601)
    pub completed_at: DateTime<Utc>,

    /// Number of trending sources the pipeline worked through
    pub sources_processed: u32,

    /// Number of shorts uploaded
    pub shorts_published: u32,

    /// Human-readable outcome
    pub summary: String,

    /// Reference to the analytics artifact written by the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_path: Option<String>,
}

impl PipelineRun {
    /// Stamp a report from the external pipeline with an id and completion time
    pub fn from_report(report: RunReport) -> Self {
        Self::from_report_at(report, Uuid::new_v4(), Utc::now())
    }

    /// Same as [`PipelineRun::from_report`] with explicit id and timestamp
    pub fn from_report_at(report: RunReport, id: Uuid, completed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            completed_at,
            sources_processed: report.sources_processed,
            shorts_published: report.shorts_published,
            summary: report.summary,
            analytics_path: report.analytics_path,
        }
    }

    /// Empty stand-in used when an error response needs a run but none exists yet
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::nil(),
            completed_at: Utc::now(),
            sources_processed: 0,
            shorts_published: 0,
            summary: "No runs recorded yet".to_string(),
            analytics_path: None,
        }
    }
}

/// What the external pipeline reports back when it finishes.
///
/// The pipeline does not know about run ids; those are assigned by the
/// gateway when the report is turned into a [`PipelineRun`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    #[serde(default)]
    pub sources_processed: u32,

    #[serde(default)]
    pub shorts_published: u32,

    #[serde(default = "default_summary")]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_path: Option<String>,
}

fn default_summary() -> String {
    "Pipeline finished".to_string()
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            sources_processed: 0,
            shorts_published: 0,
            summary: default_summary(),
            analytics_path: None,
        }
    }
}

impl RunReport {
    /// Create a report with counts and a summary
    pub fn new(sources_processed: u32, shorts_published: u32, summary: impl Into<String>) -> Self {
        Self {
            sources_processed,
            shorts_published,
            summary: summary.into(),
            analytics_path: None,
        }
    }

    /// Attach the analytics artifact path
    pub fn with_analytics_path(mut self, path: impl Into<String>) -> Self {
        self.analytics_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_json_shape() {
        let run = PipelineRun::from_report(
            RunReport::new(12, 3, "Processed 12 sources").with_analytics_path("data/analytics.json"),
        );

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["sourcesProcessed"], 12);
        assert_eq!(value["shortsPublished"], 3);
        assert_eq!(value["summary"], "Processed 12 sources");
        assert_eq!(value["analyticsPath"], "data/analytics.json");
        assert!(value["completedAt"].as_str().unwrap().contains('T'));
        assert!(value.get("id").is_some());
    }

    #[test]
    fn test_analytics_path_omitted_when_absent() {
        let run = PipelineRun::from_report(RunReport::new(1, 0, "nothing published"));
        let value = serde_json::to_value(&run).unwrap();
        assert!(value.get("analyticsPath").is_none());
    }

    #[test]
    fn test_report_defaults_from_sparse_json() {
        let report: RunReport = serde_json::from_str(r#"{"sourcesProcessed": 5}"#).unwrap();
        assert_eq!(report.sources_processed, 5);
        assert_eq!(report.shorts_published, 0);
        assert_eq!(report.summary, "Pipeline finished");
    }

    #[test]
    fn test_placeholder_is_empty() {
        let run = PipelineRun::placeholder();
        assert!(run.id.is_nil());
        assert_eq!(run.sources_processed, 0);
        assert_eq!(run.shorts_published, 0);
    }
}
