//! Candidate changes, approval requests, and rollback snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A change proposed to the safety gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateChange {
    pub project_id: String,
    pub change_type: String,
    pub description: String,
    /// Entity the change touches (memory id, rule id, file path, ...).
    pub target: String,
    /// Evidence weight in [0, 1] supplied by the caller.
    pub evidence: f64,
    /// Serialized new state to commit on approval.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A pending approval, referencing the pre-change snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub project_id: String,
    pub change: CandidateChange,
    pub confidence: f64,
    pub status: ApprovalStatus,
    pub pre_snapshot_id: String,
    pub post_snapshot_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
}

/// A state snapshot enabling rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSnapshot {
    pub id: String,
    pub project_id: String,
    pub target: String,
    /// Serialized state at snapshot time.
    pub state: serde_json::Value,
    pub taken_at: DateTime<Utc>,
}

impl ChangeSnapshot {
    pub fn capture(
        project_id: impl Into<String>,
        target: impl Into<String>,
        state: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            target: target.into(),
            state,
            taken_at: Utc::now(),
        }
    }
}
