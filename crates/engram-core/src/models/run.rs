//! Consolidation runs and their quality metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// One or more phases failed but the run finished.
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Per-run quality metrics. Targets are configured; misses are flagged
/// but never fail the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RunMetrics {
    pub compression_ratio: f64,
    pub retrieval_recall: f64,
    pub pattern_consistency: f64,
    pub information_density: f64,
    pub overall: f64,
}

impl RunMetrics {
    /// Overall quality: mean of the four component metrics.
    pub fn with_overall(mut self) -> Self {
        self.overall = (self.compression_ratio
            + self.retrieval_recall
            + self.pattern_consistency
            + self.information_density)
            / 4.0;
        self
    }
}

/// One consolidation run. At most one per project at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationRun {
    pub id: String,
    pub project_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub metrics: RunMetrics,
    /// Names of phases that failed, with reasons.
    #[serde(default)]
    pub phase_failures: Vec<String>,
    /// Metric names that missed their configured target.
    #[serde(default)]
    pub metric_misses: Vec<String>,
}

impl ConsolidationRun {
    pub fn begin(project_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            metrics: RunMetrics::default(),
            phase_failures: vec![],
            metric_misses: vec![],
        }
    }
}
