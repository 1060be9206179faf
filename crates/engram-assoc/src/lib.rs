//! # engram-assoc
//!
//! The associative network: adjacency-row links with Hebbian
//! strengthening and idle decay, bounded-BFS spreading activation, and
//! TTL-based priming and inhibition.

pub mod network;
pub mod spreading;

pub use network::AssociativeNetwork;
pub use spreading::{spread, SpreadParams};
