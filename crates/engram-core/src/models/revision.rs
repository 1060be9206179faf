use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reconsolidation update, preserved as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHistoryEntry {
    pub id: i64,
    pub memory_id: String,
    pub old_version: u64,
    pub new_version: u64,
    pub patched_at: DateTime<Utc>,
    pub reason: Option<String>,
}
