//! Patterns extracted from event clusters during consolidation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternType {
    Workflow,
    Causal,
    Preference,
    ErrorHandling,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Causal => "causal",
            Self::Preference => "preference",
            Self::ErrorHandling => "error-handling",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "workflow" => Some(Self::Workflow),
            "causal" => Some(Self::Causal),
            "preference" => Some(Self::Preference),
            "error-handling" => Some(Self::ErrorHandling),
            _ => None,
        }
    }
}

/// A recurring structure found across a cluster of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub run_id: String,
    pub project_id: String,
    pub pattern_type: PatternType,
    /// Natural-language template describing the pattern.
    pub content: String,
    pub confidence: Confidence,
    pub occurrences: u64,
    /// Ids of the events this pattern was extracted from.
    pub source_events: Vec<String>,
    pub created_at: DateTime<Utc>,
}
