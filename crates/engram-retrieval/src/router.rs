//! Strategy router: classify, gate through breakers, cascade on failure,
//! filter inhibited items, apply priming boosts, cache results.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use engram_core::config::{AttentionConfig, CacheConfig, CircuitBreakerConfig, QueryConfig};
use engram_core::deadline::Deadline;
use engram_core::errors::{EngramError, EngramResult, ErrorKind, RetrievalError};
use engram_core::memory::MemoryRecord;
use engram_core::models::{RecallHit, RecallOptions, Strategy};
use engram_core::traits::{IEmbeddingProvider, IVectorIndex};
use engram_storage::queries::entity_ops;
use engram_storage::StorageEngine;

use engram_assoc::AssociativeNetwork;

use crate::breaker::BreakerRegistry;
use crate::cache::ResultCache;
use crate::classify::classify;
use crate::strategies::{self, StrategyContext};

/// Everything the router needs, constructed once by the composition root.
pub struct RouterDeps {
    pub storage: Arc<StorageEngine>,
    pub index: Arc<dyn IVectorIndex>,
    pub embedder: Arc<dyn IEmbeddingProvider>,
    pub network: Arc<AssociativeNetwork>,
    pub query_config: QueryConfig,
    pub attention_config: AttentionConfig,
    pub cache_config: CacheConfig,
    pub breaker_config: CircuitBreakerConfig,
}

pub struct RetrievalRouter {
    deps: RouterDeps,
    cache: ResultCache,
    breakers: BreakerRegistry,
}

impl RetrievalRouter {
    pub fn new(deps: RouterDeps) -> Self {
        let cache = ResultCache::new(deps.cache_config.clone());
        let breakers = BreakerRegistry::new(deps.breaker_config.clone());
        Self {
            deps,
            cache,
            breakers,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Route one recall query. Returns scored hits, highest first.
    pub fn recall(
        &self,
        project_id: &str,
        query: &str,
        options: &RecallOptions,
        deadline: Deadline,
    ) -> EngramResult<Vec<RecallHit>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        let k = if options.k == 0 { 10 } else { options.k };

        // The active inhibition set is part of the effective arguments:
        // a cached result must not outlive an inhibition change or expiry.
        let inhibited = self
            .deps
            .network
            .inhibited_ids(self.deps.attention_config.inhibition_release_threshold)?;
        let mut inhibited_key: Vec<&str> = inhibited.iter().map(String::as_str).collect();
        inhibited_key.sort_unstable();

        let cache_key = ResultCache::key(
            project_id,
            &[
                "recall",
                query,
                &k.to_string(),
                &format!("{:?}", options.strategy),
                &format!("{:?}", options.kinds),
                &options.tags.join(","),
                &options.include_superseded.to_string(),
                &inhibited_key.join(","),
            ],
        );
        // Reconsolidating reads must not be served from cache; marking
        // labile is a side effect.
        if !options.reconsolidate {
            if let Some(hits) = self.cache.get("recall", &cache_key) {
                debug!(project_id, query, "recall served from cache");
                return Ok(hits);
            }
        }

        let chosen = match options.strategy {
            Some(strategy) => strategy,
            None if !self.deps.query_config.enabled => self.deps.query_config.default_strategy,
            None => {
                let entities: HashSet<String> = self
                    .deps
                    .storage
                    .with_reader(|conn| entity_ops::all_entity_names(conn, project_id))?
                    .into_iter()
                    .collect();
                classify(query, &entities)
            }
        };

        let (used, results) = self.run_with_cascade(project_id, query, k, chosen, deadline)?;
        let hits = self.post_process(k, used, results, options, &inhibited)?;

        if !options.reconsolidate {
            self.cache.put("recall", cache_key, hits.clone());
        }
        Ok(hits)
    }

    /// Try the chosen strategy, cascading to the remaining ones when a
    /// breaker is open or a strategy fails. Only when every strategy has
    /// failed does the caller see `StoreUnavailable`.
    fn run_with_cascade(
        &self,
        project_id: &str,
        query: &str,
        k: usize,
        chosen: Strategy,
        deadline: Deadline,
    ) -> EngramResult<(Strategy, Vec<(MemoryRecord, f64)>)> {
        let mut order = vec![chosen];
        for fallback in [
            Strategy::Hybrid,
            Strategy::Vector,
            Strategy::Keyword,
            Strategy::Temporal,
        ] {
            if !order.contains(&fallback) {
                order.push(fallback);
            }
        }

        let mut last_error: Option<EngramError> = None;
        for strategy in order {
            deadline.check("recall")?;
            if let Err(e) = self.breakers.admit(strategy) {
                debug!(strategy = %strategy, "breaker open, cascading");
                last_error = Some(e);
                continue;
            }

            let ctx = StrategyContext {
                storage: &self.deps.storage,
                index: self.deps.index.as_ref(),
                embedder: self.deps.embedder.as_ref(),
                project_id,
                query,
                k,
                vector_weight: self.deps.query_config.hybrid_vector_weight,
                deadline,
            };

            let outcome = match strategy {
                Strategy::Vector => strategies::vector::search(&ctx),
                Strategy::Keyword => strategies::keyword::search(&ctx),
                Strategy::Hybrid => strategies::hybrid::search(&ctx),
                Strategy::Graph => strategies::graph::search(&ctx),
                Strategy::Temporal => strategies::temporal::search(&ctx),
            };

            match outcome {
                Ok(results) => {
                    self.breakers.record(strategy, true);
                    return Ok((strategy, results));
                }
                Err(e) if e.kind() == ErrorKind::Timeout => {
                    // Cancellation must not trip the breaker.
                    return Err(e);
                }
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "strategy failed, cascading");
                    self.breakers.record(strategy, false);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| RetrievalError::AllStrategiesFailed.into()))
    }

    /// Inhibition filtering, kind/tag filters, priming boosts, hit
    /// construction.
    fn post_process(
        &self,
        k: usize,
        used: Strategy,
        results: Vec<(MemoryRecord, f64)>,
        options: &RecallOptions,
        inhibited: &HashSet<String>,
    ) -> EngramResult<Vec<RecallHit>> {
        let mut hits: Vec<RecallHit> = Vec::with_capacity(results.len());
        for (memory, score) in results {
            if inhibited.contains(&memory.id) {
                continue;
            }
            if !options.include_superseded && !memory.is_current() {
                continue;
            }
            if !options.kinds.is_empty() && !options.kinds.contains(&memory.kind) {
                continue;
            }
            if !options.tags.is_empty()
                && !options.tags.iter().all(|tag| memory.tags.contains(tag))
            {
                continue;
            }

            let boost = self.deps.network.priming_boost(&memory.id)?;
            let boosted = (score + 0.1 * boost).min(1.0);

            hits.push(RecallHit {
                id: memory.id.clone(),
                content: memory.searchable_text().to_string(),
                score: boosted,
                kind: memory.kind,
                timestamp: memory.created_at,
                explanation: explain(used, score, boost),
                lock_token: options.reconsolidate.then_some(memory.version),
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

fn explain(strategy: Strategy, score: f64, priming_boost: f64) -> String {
    if priming_boost > 0.0 {
        format!("{strategy} match (score {score:.3}, primed +{priming_boost:.2})")
    } else {
        format!("{strategy} match (score {score:.3})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{MemoryKind, TypedContent};
    use engram_embeddings::HashEmbedder;
    use engram_index::VectorIndex;
    use engram_storage::DualWriteCoordinator;

    fn router() -> (RetrievalRouter, Arc<StorageEngine>, Arc<VectorIndex>) {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        let index = Arc::new(VectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new());
        let network = Arc::new(AssociativeNetwork::new(storage.clone()));
        let router = RetrievalRouter::new(RouterDeps {
            storage: storage.clone(),
            index: index.clone(),
            embedder,
            network,
            query_config: QueryConfig::default(),
            attention_config: AttentionConfig::default(),
            cache_config: CacheConfig::default(),
            breaker_config: CircuitBreakerConfig::default(),
        });
        (router, storage, index)
    }

    fn store(
        storage: &StorageEngine,
        index: &Arc<VectorIndex>,
        text: &str,
    ) -> MemoryRecord {
        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, text),
            vec![],
        );
        let embedder = HashEmbedder::new();
        use engram_core::traits::IEmbeddingProvider;
        let embedding = embedder.embed(text).unwrap();
        let coordinator = DualWriteCoordinator::new(index.clone() as Arc<dyn IVectorIndex>);
        storage
            .with_writer(|conn| coordinator.store(conn, &memory, &embedding))
            .unwrap();
        memory
    }

    #[test]
    fn empty_query_returns_empty_list() {
        let (router, _, _) = router();
        let hits = router
            .recall("p1", "", &RecallOptions::top_k(5), Deadline::none())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn stored_content_is_recalled_top_one() {
        let (router, storage, index) = router();
        let memory = store(
            &storage,
            &index,
            "Docker containers provide process isolation",
        );
        store(&storage, &index, "Completely unrelated quarterly report");

        let hits = router
            .recall(
                "p1",
                "container isolation",
                &RecallOptions::top_k(3),
                Deadline::none(),
            )
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, memory.id);
    }

    #[test]
    fn forced_strategy_is_used() {
        let (router, storage, index) = router();
        store(&storage, &index, "alpha beta gamma");

        let options = RecallOptions {
            k: 3,
            strategy: Some(Strategy::Keyword),
            ..Default::default()
        };
        let hits = router
            .recall("p1", "alpha", &options, Deadline::none())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].explanation.starts_with("keyword"));
    }

    #[test]
    fn inhibited_memories_are_excluded_until_expiry() {
        let (router, storage, index) = router();
        let memory = store(&storage, &index, "suppressed fact about caching");

        router
            .deps
            .network
            .inhibit(
                &memory.id,
                engram_core::models::InhibitionType::Selective,
                60_000,
            )
            .unwrap();

        let hits = router
            .recall("p1", "caching fact", &RecallOptions::top_k(5), Deadline::none())
            .unwrap();
        assert!(hits.iter().all(|h| h.id != memory.id));
    }

    #[test]
    fn reconsolidate_requests_carry_lock_tokens() {
        let (router, storage, index) = router();
        store(&storage, &index, "labile candidate memory");

        let options = RecallOptions {
            k: 3,
            reconsolidate: true,
            ..Default::default()
        };
        let hits = router
            .recall("p1", "labile candidate", &options, Deadline::none())
            .unwrap();
        assert!(hits.iter().all(|h| h.lock_token.is_some()));
    }

    #[test]
    fn expired_deadline_surfaces_timeout() {
        let (router, storage, index) = router();
        store(&storage, &index, "anything");
        let err = router
            .recall(
                "p1",
                "anything",
                &RecallOptions::top_k(3),
                Deadline::after_ms(0),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
