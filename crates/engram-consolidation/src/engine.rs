//! ConsolidationEngine — run coordinator.
//!
//! Holds the per-project advisory guard for the duration of a run, drives
//! the six phases in order, contains phase failures (run finishes as
//! `partial`), and persists the run record with its metrics.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use engram_core::config::{CompressionConfig, ConsolidationConfig};
use engram_core::deadline::Deadline;
use engram_core::errors::{ConsolidationError, EngramResult};
use engram_core::memory::{ConsolidationState, MemoryKind};
use engram_core::models::{
    ConsolidationRun, EpisodicEvent, EventConsolidationStatus, Pattern, RunMetrics, RunStatus,
};
use engram_core::traits::{IEmbeddingProvider, ISummarizer};
use engram_storage::queries::{
    event_ops, history_ops, memory_crud, memory_query, pattern_ops, run_ops,
};
use engram_storage::{AdvisoryLocks, DualWriteCoordinator, StorageEngine};

use crate::metrics::{self, term_jaccard};
use crate::pipeline::{
    phase1_scoring, phase2_clustering, phase3_patterns, phase4_conflicts, phase5_promotion,
    phase6_compression,
};

pub struct ConsolidationEngine {
    storage: Arc<StorageEngine>,
    dual_write: Arc<DualWriteCoordinator>,
    embedder: Arc<dyn IEmbeddingProvider>,
    summarizer: Arc<dyn ISummarizer>,
    locks: Arc<AdvisoryLocks>,
    config: ConsolidationConfig,
    compression: CompressionConfig,
}

impl ConsolidationEngine {
    pub fn new(
        storage: Arc<StorageEngine>,
        dual_write: Arc<DualWriteCoordinator>,
        embedder: Arc<dyn IEmbeddingProvider>,
        summarizer: Arc<dyn ISummarizer>,
        locks: Arc<AdvisoryLocks>,
        config: ConsolidationConfig,
        compression: CompressionConfig,
    ) -> Self {
        Self {
            storage,
            dual_write,
            embedder,
            summarizer,
            locks,
            config,
            compression,
        }
    }

    /// Whether a run currently holds the project guard.
    pub fn is_running(&self, project_id: &str) -> bool {
        self.locks.project_held(project_id)
    }

    /// Execute one full run for a project. Exactly one run per project at
    /// a time; a second caller gets `AlreadyRunning`.
    pub fn run(&self, project_id: &str, deadline: Deadline) -> EngramResult<ConsolidationRun> {
        let _guard = self.locks.try_project(project_id).ok_or_else(|| {
            ConsolidationError::AlreadyRunning {
                project_id: project_id.to_string(),
            }
        })?;

        let mut run = ConsolidationRun::begin(project_id);
        self.storage.with_writer(|conn| run_ops::insert_run(conn, &run))?;
        info!(project_id, run_id = %run.id, "consolidation run started");

        let events = self
            .storage
            .with_reader(|conn| event_ops::list_pending_events(conn, project_id))?;

        let mut promoted_count = 0usize;
        let mut consumed_events = 0usize;
        let mut compression_savings: Vec<f64> = Vec::new();
        let mut patterns: Vec<Pattern> = Vec::new();

        // Phases 1-3 need embeddings; a provider failure skips them but
        // the run continues into conflicts and compression.
        deadline.check("consolidation")?;
        let scored = phase1_scoring::score_events(&events, Utc::now());

        let texts: Vec<String> = events.iter().map(|e| e.content.clone()).collect();
        match self.embedder.embed_batch(&texts) {
            Ok(embeddings) => {
                deadline.check("consolidation")?;
                let clustered = phase2_clustering::cluster_events(
                    &events,
                    &embeddings,
                    self.config.similarity_threshold,
                    self.config.time_window_ms as i64,
                    self.config.min_cluster_size,
                );
                info!(
                    clusters = clustered.clusters.len(),
                    noise = clustered.noise.len(),
                    "clustering complete"
                );

                patterns = phase3_patterns::extract_patterns(
                    &run.id,
                    project_id,
                    &events,
                    &scored,
                    &clustered.clusters,
                );
                if let Err(e) = self.persist_patterns(&patterns) {
                    run.phase_failures.push(format!("patterns: {e}"));
                }

                deadline.check("consolidation")?;
                match self.promote(project_id, &patterns, &events, &clustered.clusters) {
                    Ok((promoted, consumed)) => {
                        promoted_count = promoted;
                        consumed_events = consumed;
                    }
                    Err(e) => run.phase_failures.push(format!("promotion: {e}")),
                }
            }
            Err(e) => {
                warn!(error = %e, "embedding provider failed; skipping clustering phases");
                run.phase_failures.push(format!("clustering: {e}"));
            }
        }

        deadline.check("consolidation")?;
        if let Err(e) = self.resolve_conflicts(project_id) {
            run.phase_failures.push(format!("conflicts: {e}"));
        }

        deadline.check("consolidation")?;
        match self.compress(project_id) {
            Ok(savings) => compression_savings = savings,
            Err(e) => run.phase_failures.push(format!("compression: {e}")),
        }

        // Metrics.
        let recall = self.measure_recall(project_id).unwrap_or(0.0);
        let consistency = self
            .measure_consistency(project_id, &run.id, &patterns)
            .unwrap_or(1.0);
        let compression_ratio = if compression_savings.is_empty() {
            0.0
        } else {
            // Savings per compressed memory: 1 − (summary/original).
            compression_savings.iter().map(|r| 1.0 - r).sum::<f64>()
                / compression_savings.len() as f64
        };
        let density = if events.is_empty() {
            0.0
        } else {
            promoted_count as f64 / events.len() as f64
        };

        run.metrics = RunMetrics {
            compression_ratio,
            retrieval_recall: recall,
            pattern_consistency: consistency,
            information_density: density,
            overall: 0.0,
        }
        .with_overall();
        run.metric_misses = metrics::missed_targets(&run.metrics);
        run.status = if run.phase_failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Partial
        };
        run.finished_at = Some(Utc::now());

        self.storage.with_writer(|conn| run_ops::finish_run(conn, &run))?;
        info!(
            run_id = %run.id,
            status = run.status.as_str(),
            promoted = promoted_count,
            consumed = consumed_events,
            "consolidation run finished"
        );
        Ok(run)
    }

    fn persist_patterns(&self, patterns: &[Pattern]) -> EngramResult<()> {
        self.storage.with_writer(|conn| {
            for pattern in patterns {
                pattern_ops::insert_pattern(conn, pattern)?;
            }
            Ok(())
        })
    }

    /// Phase 5: create memories from patterns and mark source events.
    fn promote(
        &self,
        project_id: &str,
        patterns: &[Pattern],
        events: &[EpisodicEvent],
        clusters: &[Vec<usize>],
    ) -> EngramResult<(usize, usize)> {
        let promotions = self.storage.with_reader(|conn| {
            Ok(phase5_promotion::promote_patterns(project_id, patterns, |hash| {
                memory_query::find_by_content_hash(conn, project_id, hash)
                    .map(|hits| !hits.is_empty())
                    .unwrap_or(false)
            }))
        })?;

        for promotion in &promotions {
            let mut record = promotion.record.clone();
            record.consolidation_state = ConsolidationState::Consolidated;
            let embedding = self.embedder.embed(record.searchable_text())?;
            self.storage
                .with_writer(|conn| self.dual_write.store(conn, &record, &embedding))?;
        }

        // Every clustered event is consumed, pattern or not; noise stays
        // pending for a future run.
        let consumed: Vec<String> = clusters
            .iter()
            .flatten()
            .map(|&i| events[i].id.clone())
            .collect();
        self.storage.with_writer(|conn| {
            event_ops::mark_events(conn, &consumed, EventConsolidationStatus::Consolidated)
        })?;

        Ok((promotions.len(), consumed.len()))
    }

    /// Phase 4 applied to stored semantic memories.
    fn resolve_conflicts(&self, project_id: &str) -> EngramResult<()> {
        let memories = self
            .storage
            .with_reader(|conn| memory_query::list_memories(conn, project_id, Some(MemoryKind::Semantic)))?;
        if memories.len() < 2 {
            return Ok(());
        }

        let texts: Vec<String> = memories
            .iter()
            .map(|m| m.searchable_text().to_string())
            .collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        let resolutions = phase4_conflicts::resolve_conflicts(&memories, &embeddings, Utc::now());

        self.storage.with_writer(|conn| {
            for resolution in &resolutions {
                if let phase4_conflicts::Resolution::Supersede { winner, loser } = resolution {
                    if let Some(mut losing) = memory_crud::get_memory(conn, loser)? {
                        losing.superseded_by = Some(winner.clone());
                        memory_crud::update_memory(conn, &losing)?;
                        info!(winner = %winner, loser = %loser, "conflict resolved by supersession");
                    }
                }
            }
            Ok(())
        })
    }

    /// Phase 6 applied to aged memories. Returns the per-memory summary
    /// ratios for the compression metric.
    fn compress(&self, project_id: &str) -> EngramResult<Vec<f64>> {
        let now = Utc::now();
        let first_tier_days = self
            .compression
            .ages_days
            .first()
            .copied()
            .unwrap_or(7);
        let cutoff_ms =
            (now - chrono::Duration::days(first_tier_days as i64)).timestamp_millis();

        let candidates = self.storage.with_reader(|conn| {
            memory_query::list_compression_candidates(conn, project_id, cutoff_ms, 3)
        })?;

        let mut ratios = Vec::new();
        for memory in &candidates {
            let outcome = phase6_compression::compress_memory(
                memory,
                &self.compression,
                self.summarizer.as_ref(),
                now,
            )?;
            let Some(outcome) = outcome else { continue };

            self.storage.with_writer(|conn| {
                memory_crud::update_memory(conn, &outcome.memory)?;
                if let Some(archived) = &outcome.archived_original {
                    history_ops::archive_content(
                        conn,
                        &outcome.memory.id,
                        archived,
                        now.timestamp_millis(),
                    )?;
                }
                Ok(())
            })?;
            ratios.push(outcome.ratio);
        }
        Ok(ratios)
    }

    /// Retrieval recall over a held-out sample: promoted memories must be
    /// findable by their own distinctive terms.
    fn measure_recall(&self, project_id: &str) -> EngramResult<f64> {
        let consolidated = self.storage.with_reader(|conn| {
            memory_query::list_by_state(conn, project_id, "consolidated")
        })?;
        if consolidated.is_empty() {
            return Ok(1.0);
        }

        let sample: Vec<_> = consolidated.iter().take(5).collect();
        let mut found = 0usize;
        for memory in &sample {
            let query: String = memory
                .searchable_text()
                .split_whitespace()
                .take(4)
                .collect::<Vec<_>>()
                .join(" ");
            let hits = self.storage.with_reader(|conn| {
                engram_storage::queries::memory_search::search_keyword(conn, project_id, &query, 10)
            })?;
            if hits.iter().any(|(m, _)| m.id == memory.id) {
                found += 1;
            }
        }
        Ok(found as f64 / sample.len() as f64)
    }

    /// Pattern consistency: term overlap with the previous run's patterns.
    fn measure_consistency(
        &self,
        project_id: &str,
        current_run_id: &str,
        current: &[Pattern],
    ) -> EngramResult<f64> {
        let history = self
            .storage
            .with_reader(|conn| run_ops::run_history(conn, project_id, 5))?;
        let previous_run = history.iter().find(|r| r.id != current_run_id);
        let Some(previous_run) = previous_run else {
            return Ok(1.0);
        };

        let previous = self
            .storage
            .with_reader(|conn| pattern_ops::patterns_for_run(conn, &previous_run.id))?;
        if previous.is_empty() && current.is_empty() {
            return Ok(1.0);
        }

        let terms = |patterns: &[Pattern]| -> Vec<String> {
            patterns
                .iter()
                .flat_map(|p| {
                    p.content
                        .split_whitespace()
                        .map(|w| w.to_lowercase())
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        Ok(term_jaccard(&terms(current), &terms(&previous)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::ExtractiveSummarizer;
    use engram_embeddings::HashEmbedder;
    use engram_index::VectorIndex;

    fn engine() -> (ConsolidationEngine, Arc<StorageEngine>) {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        let index = Arc::new(VectorIndex::new());
        let dual_write = Arc::new(DualWriteCoordinator::new(index));
        let embedder = Arc::new(HashEmbedder::new());
        let engine = ConsolidationEngine::new(
            storage.clone(),
            dual_write,
            embedder,
            Arc::new(ExtractiveSummarizer),
            Arc::new(AdvisoryLocks::new()),
            ConsolidationConfig::default(),
            CompressionConfig::default(),
        );
        (engine, storage)
    }

    fn seed_deploy_events(storage: &StorageEngine, count: usize) {
        storage
            .with_writer(|conn| {
                for i in 0..count {
                    let mut event = EpisodicEvent::new(
                        "p1",
                        "s1",
                        "command",
                        format!("deploy service step {i} to staging"),
                    );
                    event.timestamp = Utc::now() - chrono::Duration::minutes(50 - i as i64);
                    event_ops::insert_event(conn, &event)?;
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn empty_project_run_completes() {
        let (engine, _) = engine();
        let run = engine.run("p1", Deadline::none()).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn deploy_events_produce_a_workflow_pattern_covering_all_sources() {
        let (engine, storage) = engine();
        seed_deploy_events(&storage, 10);

        let run = engine.run("p1", Deadline::none()).unwrap();
        let patterns = storage
            .with_reader(|conn| pattern_ops::patterns_for_run(conn, &run.id))
            .unwrap();

        assert!(!patterns.is_empty());
        let workflow = patterns
            .iter()
            .find(|p| p.pattern_type == engram_core::models::PatternType::Workflow)
            .expect("workflow pattern");
        assert!(workflow.confidence.value() >= 0.7);
        assert_eq!(workflow.source_events.len(), 10);
    }

    #[test]
    fn rerun_over_frozen_events_is_idempotent() {
        let (engine, storage) = engine();
        seed_deploy_events(&storage, 6);

        engine.run("p1", Deadline::none()).unwrap();
        let after_first = storage
            .with_reader(|conn| {
                memory_query::list_memories(conn, "p1", None).map(|m| m.len())
            })
            .unwrap();

        engine.run("p1", Deadline::none()).unwrap();
        let after_second = storage
            .with_reader(|conn| {
                memory_query::list_memories(conn, "p1", None).map(|m| m.len())
            })
            .unwrap();

        assert_eq!(after_first, after_second);
    }

    #[test]
    fn second_concurrent_run_is_rejected() {
        let (engine, _) = engine();
        let locks = engine.locks.clone();
        let _guard = locks.try_project("p1").unwrap();

        let err = engine.run("p1", Deadline::none()).unwrap_err();
        assert!(err.to_string().contains("already in progress"));
    }
}
