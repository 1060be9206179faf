//! # engram-core
//!
//! Foundation crate for the Engram memory system.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod deadline;
pub mod errors;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::EngramConfig;
pub use deadline::Deadline;
pub use errors::{EngramError, EngramResult, ErrorKind};
pub use memory::{
    Activation, Confidence, ConsolidationState, MemoryKind, MemoryRecord, Priority, Progress,
    Strength, TypedContent, Usefulness,
};
