use serde::{Deserialize, Serialize};

use super::defaults;

/// Consolidation pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsolidationConfig {
    /// Interval between scheduled runs.
    pub schedule_ms: u64,
    /// Minimum cluster size that emits a pattern.
    pub min_cluster_size: usize,
    /// Cosine threshold for clustering.
    pub similarity_threshold: f64,
    /// Temporal proximity window for clustering.
    pub time_window_ms: u64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            schedule_ms: defaults::CONSOLIDATION_SCHEDULE_MS,
            min_cluster_size: defaults::MIN_CLUSTER_SIZE,
            similarity_threshold: defaults::SIMILARITY_THRESHOLD,
            time_window_ms: defaults::TIME_WINDOW_MS,
        }
    }
}
