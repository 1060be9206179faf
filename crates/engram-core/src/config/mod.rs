//! Configuration. One struct per recognized section; unknown keys are
//! rejected at load time via `deny_unknown_fields`.

pub mod defaults;

mod agents_config;
mod attention_config;
mod breaker_config;
mod cache_config;
mod compression_config;
mod consolidation_config;
mod optimization_config;
mod quota_config;
mod reconsolidation_config;
mod working_config;

pub use agents_config::AgentsConfig;
pub use attention_config::{AttentionConfig, SalienceAggregator};
pub use breaker_config::CircuitBreakerConfig;
pub use cache_config::CacheConfig;
pub use compression_config::CompressionConfig;
pub use consolidation_config::ConsolidationConfig;
pub use optimization_config::{OptimizationConfig, QueryConfig};
pub use quota_config::QuotaConfig;
pub use reconsolidation_config::ReconsolidationConfig;
pub use working_config::WorkingMemoryConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{EngramError, EngramResult};

/// Root configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngramConfig {
    pub cache: CacheConfig,
    pub optimization: OptimizationConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub working_memory: WorkingMemoryConfig,
    pub attention: AttentionConfig,
    pub consolidation: ConsolidationConfig,
    pub reconsolidation: ReconsolidationConfig,
    pub compression: CompressionConfig,
    pub agents: AgentsConfig,
    pub quota: QuotaConfig,
}

impl EngramConfig {
    /// Parse a TOML document. Unknown keys anywhere in the tree fail the
    /// load with `InvalidArgument`.
    pub fn from_toml(text: &str) -> EngramResult<Self> {
        toml::from_str(text).map_err(|e| EngramError::InvalidArgument {
            argument: "config".into(),
            reason: e.to_string(),
        })
    }
}
