use serde::{Deserialize, Serialize};

use super::defaults;

/// Agent-registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentsConfig {
    pub heartbeat_interval_ms: u64,
    /// Heartbeat age past which an agent is marked offline.
    pub stale_threshold_ms: u64,
    /// Times a task is requeued before it fails permanently.
    pub max_retries: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: defaults::AGENT_HEARTBEAT_INTERVAL_MS,
            stale_threshold_ms: defaults::AGENT_STALE_THRESHOLD_MS,
            max_retries: defaults::AGENT_MAX_RETRIES,
        }
    }
}
