//! # engram-engine
//!
//! Composition root for the Engram memory engine. Constructs the
//! process-wide singletons once (pool, vector index, result cache,
//! circuit breakers, advisory locks, rate-limited adapters) and exposes
//! the public operation surface. All operations present a blocking
//! contract with explicit deadlines.

mod builder;
mod ops_admin;
mod ops_events;
mod ops_executive;
mod ops_memory;
mod ops_recall;
pub mod scheduler;

pub use builder::EngineBuilder;
pub use ops_admin::MaintenanceReport;
pub use ops_recall::WorkingMemorySnapshot;

use std::sync::Arc;

use engram_assoc::AssociativeNetwork;
use engram_attention::FocusManager;
use engram_consolidation::ConsolidationEngine;
use engram_core::config::EngramConfig;
use engram_core::traits::IEmbeddingProvider;
use engram_executive::{AgentRegistry, GoalManager, TaskManager};
use engram_gate::SafetyGate;
use engram_index::VectorIndex;
use engram_retrieval::{ReconsolidationController, RetrievalRouter};
use engram_storage::{AdvisoryLocks, DualWriteCoordinator, Reconciler, StorageEngine};
use engram_working::WorkingMemoryManager;

/// The assembled engine. Construct via [`EngineBuilder`].
pub struct Engine {
    pub(crate) config: EngramConfig,
    pub(crate) storage: Arc<StorageEngine>,
    pub(crate) index: Arc<VectorIndex>,
    pub(crate) dual_write: Arc<DualWriteCoordinator>,
    pub(crate) embedder: Arc<dyn IEmbeddingProvider>,
    pub(crate) locks: Arc<AdvisoryLocks>,
    pub(crate) network: Arc<AssociativeNetwork>,
    pub(crate) working: WorkingMemoryManager,
    pub(crate) focus: FocusManager,
    pub(crate) router: RetrievalRouter,
    pub(crate) recon: ReconsolidationController,
    pub(crate) consolidation: ConsolidationEngine,
    pub(crate) goals: GoalManager,
    pub(crate) tasks: TaskManager,
    pub(crate) agents: AgentRegistry,
    pub(crate) gate: SafetyGate,
    pub(crate) reconciler: Reconciler,
}

impl Engine {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// Test/ops access to the vector index availability gate.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Direct storage access for operational tooling and tests.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }
}

/// Install the default tracing subscriber (env-filtered). Call once from
/// the hosting process; tests skip it.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
