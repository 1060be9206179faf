use serde::{Deserialize, Serialize};

use super::defaults;

/// How salience components combine into a composite score.
///
/// The source material is ambiguous between a max and a weighted sum, so
/// the aggregator is configurable; max is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalienceAggregator {
    #[default]
    Max,
    WeightedSum,
}

/// Attention-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttentionConfig {
    pub aggregator: SalienceAggregator,
    pub novelty_weight: f64,
    pub surprise_weight: f64,
    pub contradiction_weight: f64,
    /// Inhibition strength below which a suppressed item is released.
    pub inhibition_release_threshold: f64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            aggregator: SalienceAggregator::Max,
            novelty_weight: defaults::SALIENCE_NOVELTY_WEIGHT,
            surprise_weight: defaults::SALIENCE_SURPRISE_WEIGHT,
            contradiction_weight: defaults::SALIENCE_CONTRADICTION_WEIGHT,
            inhibition_release_threshold: defaults::INHIBITION_RELEASE_THRESHOLD,
        }
    }
}
