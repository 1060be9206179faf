//! Engine assembly. Everything process-wide is built exactly once here
//! and injected; nothing else constructs pools, caches, or breakers.

use std::path::PathBuf;
use std::sync::Arc;

use engram_assoc::AssociativeNetwork;
use engram_attention::FocusManager;
use engram_consolidation::{ConsolidationEngine, ExtractiveSummarizer};
use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;
use engram_core::traits::{IEmbeddingProvider, ISummarizer};
use engram_embeddings::{CachedEmbedder, HashEmbedder, RateLimited, TokenBucket};
use engram_gate::{SafetyGate, SafetyGateConfig};
use engram_index::VectorIndex;
use engram_retrieval::{ReconsolidationController, RetrievalRouter, RouterDeps};
use engram_storage::{AdvisoryLocks, DualWriteCoordinator, Reconciler, StorageEngine};
use engram_working::WorkingMemoryManager;

use crate::Engine;

/// Adapter rate limit: calls per second and queue depth.
const ADAPTER_RATE_PER_SEC: f64 = 50.0;
const ADAPTER_BURST: u32 = 100;
const ADAPTER_QUEUE_DEPTH: usize = 64;

/// Embedding cache entries.
const EMBEDDING_CACHE_ENTRIES: u64 = 10_000;

#[derive(Default)]
pub struct EngineBuilder {
    config: EngramConfig,
    path: Option<PathBuf>,
    embedder: Option<Arc<dyn IEmbeddingProvider>>,
    summarizer: Option<Arc<dyn ISummarizer>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngramConfig) -> Self {
        self.config = config;
        self
    }

    /// Back the relational store with a file. Without this the engine is
    /// in-memory (tests).
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Inject an embedding provider (e.g. the HTTP adapter). Defaults to
    /// the deterministic local embedder.
    pub fn embedder(mut self, embedder: Arc<dyn IEmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Inject an LLM summarizer. Defaults to the extractive one.
    pub fn summarizer(mut self, summarizer: Arc<dyn ISummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn build(self) -> EngramResult<Engine> {
        let storage = Arc::new(match &self.path {
            Some(path) => StorageEngine::open(path)?,
            None => StorageEngine::open_in_memory()?,
        });

        let index = Arc::new(VectorIndex::new());
        let dual_write = Arc::new(DualWriteCoordinator::new(index.clone()));
        let locks = Arc::new(AdvisoryLocks::new());

        let raw_embedder: Arc<dyn IEmbeddingProvider> = self
            .embedder
            .unwrap_or_else(|| Arc::new(HashEmbedder::new()));
        let limited: Arc<dyn IEmbeddingProvider> = Arc::new(RateLimited::new(
            raw_embedder,
            TokenBucket::new(ADAPTER_BURST, ADAPTER_RATE_PER_SEC),
            ADAPTER_QUEUE_DEPTH,
        ));
        let embedder: Arc<dyn IEmbeddingProvider> =
            Arc::new(CachedEmbedder::new(limited, EMBEDDING_CACHE_ENTRIES));

        let summarizer: Arc<dyn ISummarizer> = self
            .summarizer
            .unwrap_or_else(|| Arc::new(ExtractiveSummarizer));

        let network = Arc::new(AssociativeNetwork::new(storage.clone()));
        let working =
            WorkingMemoryManager::new(storage.clone(), self.config.working_memory.clone());

        let router = RetrievalRouter::new(RouterDeps {
            storage: storage.clone(),
            index: index.clone(),
            embedder: embedder.clone(),
            network: network.clone(),
            query_config: self.config.optimization.query.clone(),
            attention_config: self.config.attention.clone(),
            cache_config: self.config.cache.clone(),
            breaker_config: self.config.circuit_breaker.clone(),
        });

        let recon = ReconsolidationController::new(
            storage.clone(),
            dual_write.clone(),
            embedder.clone(),
            locks.clone(),
            self.config.reconsolidation.clone(),
        );

        let consolidation = ConsolidationEngine::new(
            storage.clone(),
            dual_write.clone(),
            embedder.clone(),
            summarizer,
            locks.clone(),
            self.config.consolidation.clone(),
            self.config.compression.clone(),
        );

        let goals = engram_executive::GoalManager::new(storage.clone());
        let tasks =
            engram_executive::TaskManager::new(storage.clone(), self.config.agents.max_retries);
        let agents =
            engram_executive::AgentRegistry::new(storage.clone(), self.config.agents.clone());
        let gate = SafetyGate::new(storage.clone(), SafetyGateConfig::default());
        let reconciler = Reconciler::new(index.clone());

        Ok(Engine {
            config: self.config,
            storage,
            index,
            dual_write,
            embedder,
            locks,
            network,
            working,
            focus: FocusManager::new(),
            router,
            recon,
            consolidation,
            goals,
            tasks,
            agents,
            gate,
            reconciler,
        })
    }
}
