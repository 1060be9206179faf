use serde::{Deserialize, Serialize};

use super::defaults;

/// Result-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: u64,
    pub default_ttl_ms: u64,
    pub warming_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::CACHE_ENABLED,
            max_size: defaults::CACHE_MAX_SIZE,
            default_ttl_ms: defaults::CACHE_DEFAULT_TTL_MS,
            warming_enabled: defaults::CACHE_WARMING_ENABLED,
        }
    }
}
