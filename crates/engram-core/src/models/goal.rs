//! Goal hierarchy shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{Priority, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Primary,
    Subgoal,
    Maintenance,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Subgoal => "subgoal",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "subgoal" => Some(Self::Subgoal),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Suspended,
    Completed,
    Failed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned)
    }
}

/// A node in the per-project goal tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub project_id: String,
    pub text: String,
    pub goal_type: GoalType,
    pub parent_id: Option<String>,
    /// Inherited from the parent unless explicitly overridden.
    pub priority: Priority,
    pub priority_overridden: bool,
    pub status: GoalStatus,
    pub progress: Progress,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(project_id: impl Into<String>, text: impl Into<String>, goal_type: GoalType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            text: text.into(),
            goal_type,
            parent_id: None,
            priority: Priority::default(),
            priority_overridden: false,
            status: GoalStatus::Active,
            progress: Progress::default(),
            deadline: None,
            created_at: Utc::now(),
        }
    }
}
