//! # engram-attention
//!
//! Salience scoring (novelty, surprise, contradiction — aggregation
//! configurable), the per-project focus state machine with switch-cost
//! logging, and the inhibition policy.

pub mod focus;
pub mod salience;

pub use focus::FocusManager;
pub use salience::{score_salience, SalienceInputs};
