use serde::{Deserialize, Serialize};

use super::defaults;

/// Reconsolidation window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconsolidationConfig {
    /// How long a retrieved memory stays labile.
    pub window_ms: u64,
}

impl Default for ReconsolidationConfig {
    fn default() -> Self {
        Self {
            window_ms: defaults::RECONSOLIDATION_WINDOW_MS,
        }
    }
}
