use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project owns memories, events, tasks, goals, entities, and rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    /// Unique human name.
    pub name: String,
    /// Filesystem path the project is anchored to.
    pub path: String,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; cascades are resolved lazily.
    pub deleted: bool,
    pub memory_count: u64,
    pub event_count: u64,
    pub procedure_count: u64,
    pub entity_count: u64,
    /// Set when any quota has been hit at least once.
    pub quota_flagged: bool,
}

impl Project {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            path: path.into(),
            created_at: Utc::now(),
            deleted: false,
            memory_count: 0,
            event_count: 0,
            procedure_count: 0,
            entity_count: 0,
            quota_flagged: false,
        }
    }
}
