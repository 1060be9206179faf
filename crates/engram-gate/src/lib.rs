//! # engram-gate
//!
//! The rule and safety gate: evaluates proposed changes against enabled
//! project rules (structured results, never errors), auto-approves or
//! auto-rejects on confidence thresholds, and routes the rest through an
//! approval flow backed by pre/post-change snapshots for rollback.

pub mod evaluate;
pub mod gate;

pub use evaluate::evaluate_change;
pub use gate::{SafetyGate, SafetyGateConfig};
