use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::Strategy;

/// Query-planner configuration (`optimization.query`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub enabled: bool,
    /// Per-strategy weights applied during fusion and routing.
    pub strategy_weights: HashMap<String, f64>,
    /// Strategy used when classification is inconclusive.
    pub default_strategy: Strategy,
    /// Vector weight w in hybrid fusion: w·rank_v + (1−w)·rank_k.
    pub hybrid_vector_weight: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::QUERY_OPTIMIZATION_ENABLED,
            strategy_weights: HashMap::new(),
            default_strategy: Strategy::Hybrid,
            hybrid_vector_weight: defaults::HYBRID_VECTOR_WEIGHT,
        }
    }
}

/// Optimization section wrapper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizationConfig {
    pub query: QueryConfig,
}
