//! Prospective tasks with dependencies and optimistic claim versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "assigned" => Some(Self::Assigned),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "blocked" => Some(Self::Blocked),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A queued unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Capabilities an agent must have to claim this task.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Task ids that must be completed first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub assignee: Option<String>,
    /// Optimistic-lock version; claims must match it.
    pub version: u64,
    pub retry_count: u32,
    pub effort_estimate_ms: Option<u64>,
    pub effort_actual_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(project_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            content: content.into(),
            status: TaskStatus::Pending,
            priority: Priority::default(),
            requirements: vec![],
            dependencies: vec![],
            assignee: None,
            version: 1,
            retry_count: 0,
            effort_estimate_ms: None,
            effort_actual_ms: None,
            created_at: Utc::now(),
        }
    }
}
