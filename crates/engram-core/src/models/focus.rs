//! Attention focus state and task-switch records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// How prominent a focus target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FocusLevel {
    Primary,
    Secondary,
    Background,
}

/// What kind of transition moved the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FocusTransition {
    Voluntary,
    Automatic,
    Interruption,
    Return,
}

impl FocusTransition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voluntary => "voluntary",
            Self::Automatic => "automatic",
            Self::Interruption => "interruption",
            Self::Return => "return",
        }
    }
}

/// One focused target (a goal, task, or memory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FocusTarget {
    pub target_id: String,
    pub label: String,
    #[ts(type = "string")]
    pub since: DateTime<Utc>,
}

/// Per-project focus state: one primary, optional secondary, any number of
/// background foci.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FocusState {
    pub primary: Option<FocusTarget>,
    pub secondary: Option<FocusTarget>,
    #[serde(default)]
    pub background: Vec<FocusTarget>,
}

/// A recorded task switch with its cost and preserved context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSwitch {
    pub id: String,
    pub project_id: String,
    pub from_goal: Option<String>,
    pub to_goal: String,
    pub transition: FocusTransition,
    pub cost_ms: u64,
    /// Snapshot of pinned working-item ids at switch time.
    pub pinned_items: Vec<String>,
    pub switched_at: DateTime<Utc>,
}

impl TaskSwitch {
    pub fn new(
        project_id: impl Into<String>,
        from_goal: Option<String>,
        to_goal: impl Into<String>,
        transition: FocusTransition,
        cost_ms: u64,
        pinned_items: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            from_goal,
            to_goal: to_goal.into(),
            transition,
            cost_ms,
            pinned_items,
            switched_at: Utc::now(),
        }
    }
}
