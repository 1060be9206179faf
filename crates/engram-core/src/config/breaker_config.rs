use serde::{Deserialize, Serialize};

use super::defaults;

/// Per-strategy circuit-breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Failure ratio over the window that opens the breaker.
    pub failure_threshold: f64,
    /// Consecutive half-open successes required to close.
    pub success_threshold: u32,
    pub cool_down_ms: u64,
    /// Minimum calls in the window before the ratio is considered.
    pub min_volume: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::BREAKER_FAILURE_THRESHOLD,
            success_threshold: defaults::BREAKER_SUCCESS_THRESHOLD,
            cool_down_ms: defaults::BREAKER_COOL_DOWN_MS,
            min_volume: defaults::BREAKER_MIN_VOLUME,
        }
    }
}
