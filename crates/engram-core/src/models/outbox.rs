//! Outbox rows for dual-write compensation failures. Drained by the
//! reconciliation sweeper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxOp {
    IndexUpsert,
    IndexDelete,
}

impl OutboxOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndexUpsert => "index_upsert",
            Self::IndexDelete => "index_delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "index_upsert" => Some(Self::IndexUpsert),
            "index_delete" => Some(Self::IndexDelete),
            _ => None,
        }
    }
}

/// A deferred index operation awaiting reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub op: OutboxOp,
    pub memory_id: String,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
}
