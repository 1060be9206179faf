//! Clamped scalar newtypes. Construction clamps, so a value of these types
//! is always in range; arithmetic goes through `new` again.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Confidence score clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Confidence(f64);

impl Confidence {
    /// High confidence threshold — memories above this are considered reliable.
    pub const HIGH: f64 = 0.8;
    /// Low confidence threshold — memories below this may need validation.
    pub const LOW: f64 = 0.3;

    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self.0 >= Self::HIGH
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(1.0)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Working-item activation clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Activation(f64);

impl Activation {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Multiply by a factor, clamping back into range.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self(1.0)
    }
}

impl From<f64> for Activation {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Association-link strength clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Strength(f64);

impl Strength {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// One Hebbian step: s ← s + rate·(1 − s).
    pub fn strengthened(self, rate: f64) -> Self {
        Self::new(self.0 + rate * (1.0 - self.0))
    }

    /// One multiplicative decay tick.
    pub fn decayed(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }
}

impl From<f64> for Strength {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Integer priority clamped to [1, 10]. Higher is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(u8);

impl Priority {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 10))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(5)
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// Goal progress clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct Progress(f64);

impl Progress {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 >= 1.0
    }
}

impl From<f64> for Progress {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Consolidation usefulness score clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct Usefulness(f64);

impl Usefulness {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Usefulness {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn confidence_always_in_range(v in -10.0f64..10.0) {
            let c = Confidence::new(v);
            prop_assert!((0.0..=1.0).contains(&c.value()));
        }

        #[test]
        fn strength_hebbian_step_stays_in_range(s in 0.0f64..=1.0) {
            let after = Strength::new(s).strengthened(0.05);
            prop_assert!((0.0..=1.0).contains(&after.value()));
            prop_assert!(after.value() >= s);
        }

        #[test]
        fn priority_always_in_one_to_ten(v in 0u8..=255) {
            let p = Priority::new(v);
            prop_assert!((1..=10).contains(&p.value()));
        }
    }

    #[test]
    fn activation_scaling_clamps_at_one() {
        let a = Activation::new(0.95).scaled(1.1);
        assert_eq!(a.value(), 1.0);
    }

    #[test]
    fn hebbian_step_approaches_one_asymptotically() {
        let mut s = Strength::new(0.5);
        for _ in 0..1000 {
            s = s.strengthened(0.05);
        }
        assert!(s.value() > 0.99);
        assert!(s.value() <= 1.0);
    }
}
