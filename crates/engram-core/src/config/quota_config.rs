use serde::{Deserialize, Serialize};

use super::defaults;

/// Per-project resource caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuotaConfig {
    pub max_memories: u64,
    pub max_events: u64,
    pub max_procedures: u64,
    pub max_entities: u64,
    pub max_storage_bytes: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_memories: defaults::QUOTA_MAX_MEMORIES,
            max_events: defaults::QUOTA_MAX_EVENTS,
            max_procedures: defaults::QUOTA_MAX_PROCEDURES,
            max_entities: defaults::QUOTA_MAX_ENTITIES,
            max_storage_bytes: defaults::QUOTA_MAX_STORAGE_BYTES,
        }
    }
}
