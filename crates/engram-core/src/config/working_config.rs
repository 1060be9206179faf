use serde::{Deserialize, Serialize};

use super::defaults;
use crate::constants::WORKING_CAPACITY_HARD_CAP;

/// Working-memory buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkingMemoryConfig {
    /// Requested capacity; clamped to the hard cap of 9 at use sites.
    pub capacity: usize,
    /// Default decay constant k.
    pub decay_rate: f64,
    /// Activation below which items are evicted.
    pub admission_threshold: f64,
}

impl WorkingMemoryConfig {
    /// Capacity after applying the hard cap.
    pub fn effective_capacity(&self) -> usize {
        self.capacity.clamp(1, WORKING_CAPACITY_HARD_CAP)
    }
}

impl Default for WorkingMemoryConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::WORKING_CAPACITY,
            decay_rate: defaults::WORKING_DECAY_RATE,
            admission_threshold: defaults::WORKING_ADMISSION_THRESHOLD,
        }
    }
}
