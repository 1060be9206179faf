//! Episodic events — timestamped observations consumed by consolidation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Situational context captured with an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    pub cwd: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    pub task: Option<String>,
    pub phase: Option<String>,
    pub branch: Option<String>,
}

/// Consolidation status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventConsolidationStatus {
    Pending,
    Consolidated,
    Skipped,
}

impl EventConsolidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Consolidated => "consolidated",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "consolidated" => Some(Self::Consolidated),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// A timestamped observation with situational context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicEvent {
    pub id: String,
    pub project_id: String,
    pub session: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub content: String,
    pub outcome: Option<String>,
    pub context: EventContext,
    /// How much was learned from this event, in [0, 1].
    pub learning_delta: f64,
    /// |observed − predicted| when a prediction existed, else 0.
    pub surprise: f64,
    pub access_count: u64,
    pub confidence: f64,
    pub consolidation_status: EventConsolidationStatus,
}

impl EpisodicEvent {
    pub fn new(
        project_id: impl Into<String>,
        session: impl Into<String>,
        event_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            session: session.into(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            content: content.into(),
            outcome: None,
            context: EventContext::default(),
            learning_delta: 0.0,
            surprise: 0.0,
            access_count: 0,
            confidence: 1.0,
            consolidation_status: EventConsolidationStatus::Pending,
        }
    }
}
