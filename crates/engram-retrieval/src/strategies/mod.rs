//! The five retrieval strategies. Each takes the shared context and
//! returns scored memories, highest first.

pub mod graph;
pub mod hybrid;
pub mod keyword;
pub mod temporal;
pub mod vector;

use engram_core::deadline::Deadline;
use engram_core::traits::{IEmbeddingProvider, IVectorIndex};
use engram_storage::StorageEngine;

/// Everything a strategy needs for one query.
pub struct StrategyContext<'a> {
    pub storage: &'a StorageEngine,
    pub index: &'a dyn IVectorIndex,
    pub embedder: &'a dyn IEmbeddingProvider,
    pub project_id: &'a str,
    pub query: &'a str,
    pub k: usize,
    /// Vector weight w for hybrid fusion.
    pub vector_weight: f64,
    pub deadline: Deadline,
}
