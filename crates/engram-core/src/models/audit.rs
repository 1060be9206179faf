//! Audit-trail shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    Create,
    Update,
    Forget,
    Reconsolidate,
    Approve,
    Reject,
    Rollback,
}

impl AuditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Forget => "forget",
            Self::Reconsolidate => "reconsolidate",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Rollback => "rollback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    System,
    Agent(String),
    User(String),
}

impl AuditActor {
    pub fn label(&self) -> String {
        match self {
            Self::System => "system".into(),
            Self::Agent(id) => format!("agent:{id}"),
            Self::User(id) => format!("user:{id}"),
        }
    }
}

/// One audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub entity_kind: String,
    pub entity_id: String,
    pub operation: AuditOperation,
    pub actor: String,
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
