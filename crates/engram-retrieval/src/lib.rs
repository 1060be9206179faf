//! # engram-retrieval
//!
//! The retrieval router: query classification, five strategies (vector,
//! keyword, hybrid, graph, temporal), weighted rank fusion, a TTL result
//! cache with a static invalidation map, per-strategy circuit breakers
//! with cascade, and the reconsolidation controller.

pub mod breaker;
pub mod cache;
pub mod classify;
pub mod fusion;
pub mod recon;
pub mod router;
pub mod strategies;

pub use breaker::{BreakerRegistry, BreakerState, CircuitBreaker};
pub use cache::ResultCache;
pub use recon::ReconsolidationController;
pub use router::{RetrievalRouter, RouterDeps};
