use serde::{Deserialize, Serialize};

use super::defaults;

/// Age-tiered compression configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Age thresholds for levels 1/2/3, in days, ascending.
    pub ages_days: Vec<u32>,
    /// Target token ratio (summary / original) per level.
    pub ratio_target: f64,
    /// Minimum acceptable fidelity score for a summary.
    pub fidelity_threshold: f64,
}

impl CompressionConfig {
    /// Compression level for a memory of the given age, 0 = none.
    pub fn level_for_age_days(&self, age_days: u32) -> u8 {
        let mut level = 0u8;
        for (i, threshold) in self.ages_days.iter().enumerate() {
            if age_days >= *threshold {
                level = (i + 1) as u8;
            }
        }
        level.min(3)
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ages_days: defaults::COMPRESSION_AGES_DAYS.to_vec(),
            ratio_target: defaults::COMPRESSION_RATIO_TARGET,
            fidelity_threshold: defaults::COMPRESSION_FIDELITY_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tiers_by_age() {
        let config = CompressionConfig::default();
        assert_eq!(config.level_for_age_days(1), 0);
        assert_eq!(config.level_for_age_days(7), 1);
        assert_eq!(config.level_for_age_days(45), 2);
        assert_eq!(config.level_for_age_days(90), 3);
        assert_eq!(config.level_for_age_days(400), 3);
    }
}
