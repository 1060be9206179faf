//! # engram-executive
//!
//! The executive and prospective layer: goal hierarchy with percolating
//! completion, a dependency-gated task queue with optimistic claims, and
//! the agent registry with heartbeat staleness handling.

pub mod agents;
pub mod goals;
pub mod tasks;

pub use agents::AgentRegistry;
pub use goals::GoalManager;
pub use tasks::TaskManager;
