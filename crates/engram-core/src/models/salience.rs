use serde::{Deserialize, Serialize};

/// Salience components for an incoming item, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalienceScore {
    pub novelty: f64,
    pub surprise: f64,
    pub contradiction: f64,
    /// Aggregated value; aggregation rule is configured.
    pub composite: f64,
}

impl SalienceScore {
    pub fn clamped(novelty: f64, surprise: f64, contradiction: f64, composite: f64) -> Self {
        Self {
            novelty: novelty.clamp(0.0, 1.0),
            surprise: surprise.clamp(0.0, 1.0),
            contradiction: contradiction.clamp(0.0, 1.0),
            composite: composite.clamp(0.0, 1.0),
        }
    }
}
