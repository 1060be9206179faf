//! Reconsolidation controller.
//!
//! Retrieval with `reconsolidate=true` marks a memory labile and hands
//! the caller a lock token (the record version). One supervised update
//! may land inside the window: a new row at version+1, the old row
//! superseded, vectors swapped, history recorded. After the window the
//! memory returns to `consolidated`; stale tokens fail with
//! `VersionConflict`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tracing::info;

use engram_core::config::ReconsolidationConfig;
use engram_core::constants::SUPERSESSION_CHAIN_LIMIT;
use engram_core::errors::{EngramError, EngramResult, RetrievalError};
use engram_core::memory::{ConsolidationState, MemoryRecord, TypedContent};
use engram_core::traits::{IEmbeddingProvider, IVectorIndex as _};
use engram_storage::queries::{history_ops, memory_crud};
use engram_storage::{AdvisoryLocks, DualWriteCoordinator, StorageEngine};

struct LabileEntry {
    token: u64,
    opened_at: Instant,
}

pub struct ReconsolidationController {
    storage: Arc<StorageEngine>,
    dual_write: Arc<DualWriteCoordinator>,
    embedder: Arc<dyn IEmbeddingProvider>,
    locks: Arc<AdvisoryLocks>,
    window: Duration,
    labile: DashMap<String, LabileEntry>,
}

impl ReconsolidationController {
    pub fn new(
        storage: Arc<StorageEngine>,
        dual_write: Arc<DualWriteCoordinator>,
        embedder: Arc<dyn IEmbeddingProvider>,
        locks: Arc<AdvisoryLocks>,
        config: ReconsolidationConfig,
    ) -> Self {
        Self {
            storage,
            dual_write,
            embedder,
            locks,
            window: Duration::from_millis(config.window_ms),
            labile: DashMap::new(),
        }
    }

    /// Mark a retrieved memory labile. Returns the lock token callers
    /// must present to update. Re-marking refreshes the window.
    pub fn mark_labile(&self, memory_id: &str) -> EngramResult<u64> {
        let lock = self.locks.memory(memory_id);
        let _guard = lock.lock().expect("memory lock poisoned");

        let memory = self
            .storage
            .with_writer(|conn| {
                let Some(mut memory) = memory_crud::get_memory(conn, memory_id)? else {
                    return Err(EngramError::memory_not_found(memory_id));
                };
                memory.consolidation_state = ConsolidationState::Labile;
                memory.last_accessed = Utc::now();
                memory_crud::update_memory(conn, &memory)?;
                Ok(memory)
            })?;

        self.labile.insert(
            memory_id.to_string(),
            LabileEntry {
                token: memory.version,
                opened_at: Instant::now(),
            },
        );
        Ok(memory.version)
    }

    /// Apply a supervised update inside the window.
    pub fn update(
        &self,
        memory_id: &str,
        new_content: TypedContent,
        expected_version: u64,
        reason: Option<&str>,
    ) -> EngramResult<MemoryRecord> {
        let lock = self.locks.memory(memory_id);
        let _guard = lock.lock().expect("memory lock poisoned");

        let Some(entry) = self.labile.get(memory_id) else {
            return Err(RetrievalError::WindowClosed {
                memory_id: memory_id.to_string(),
            }
            .into());
        };
        if entry.opened_at.elapsed() > self.window {
            drop(entry);
            self.close(memory_id)?;
            return Err(RetrievalError::WindowClosed {
                memory_id: memory_id.to_string(),
            }
            .into());
        }
        let token = entry.token;
        drop(entry);

        let old = self
            .storage
            .with_reader(|conn| memory_crud::get_memory(conn, memory_id))?
            .ok_or_else(|| EngramError::memory_not_found(memory_id))?;

        // Stale lock token (or a second update with the same token after
        // the first landed) conflicts.
        let head = self.resolve_head(&old)?;
        if expected_version != token || head.version != token || head.id != old.id {
            return Err(EngramError::VersionConflict {
                id: memory_id.to_string(),
                expected: expected_version,
                actual: head.version,
            });
        }

        // New row: same project and kind, bumped version.
        let mut new_record = MemoryRecord::new(old.project_id.clone(), new_content, old.tags.clone());
        new_record.version = old.version + 1;
        new_record.consolidation_state = ConsolidationState::Consolidated;
        new_record.usefulness = old.usefulness;
        new_record.confidence = old.confidence;
        new_record.stance = old.stance;

        let embedding = self.embedder.embed(new_record.searchable_text())?;
        let now_ms = Utc::now().timestamp_millis();

        self.storage.with_writer(|conn| {
            self.dual_write.store(conn, &new_record, &embedding)?;
            // Old vector goes away; queries now land on the new row.
            self.dual_write
                .index()
                .delete(&old.project_id, &old.id)
                .map_err(|e| EngramError::IndexUnavailable {
                    reason: e.to_string(),
                })?;

            let mut superseded = old.clone();
            superseded.superseded_by = Some(new_record.id.clone());
            superseded.consolidation_state = ConsolidationState::Consolidated;
            memory_crud::update_memory(conn, &superseded)?;

            history_ops::record_update(
                conn,
                &old.id,
                old.version,
                new_record.version,
                now_ms,
                reason,
            )?;
            Ok(())
        })?;

        // The one in-flight reconsolidation has landed.
        self.labile.remove(memory_id);
        info!(
            memory_id,
            old_version = old.version,
            new_version = new_record.version,
            "reconsolidation update applied"
        );
        Ok(new_record)
    }

    /// Return expired labile items to `consolidated`. Called by the
    /// maintenance sweep.
    pub fn sweep_expired(&self) -> EngramResult<usize> {
        let expired: Vec<String> = self
            .labile
            .iter()
            .filter(|entry| entry.value().opened_at.elapsed() > self.window)
            .map(|entry| entry.key().clone())
            .collect();

        for memory_id in &expired {
            self.close(memory_id)?;
        }
        Ok(expired.len())
    }

    fn close(&self, memory_id: &str) -> EngramResult<()> {
        self.labile.remove(memory_id);
        self.storage.with_writer(|conn| {
            if let Some(mut memory) = memory_crud::get_memory(conn, memory_id)? {
                if memory.consolidation_state == ConsolidationState::Labile {
                    memory.consolidation_state = ConsolidationState::Consolidated;
                    memory_crud::update_memory(conn, &memory)?;
                }
            }
            Ok(())
        })
    }

    /// Follow the supersession chain to the current head, bounded by a
    /// safety depth.
    fn resolve_head(&self, memory: &MemoryRecord) -> EngramResult<MemoryRecord> {
        let mut current = memory.clone();
        for _ in 0..SUPERSESSION_CHAIN_LIMIT {
            match &current.superseded_by {
                None => return Ok(current),
                Some(next_id) => {
                    current = self
                        .storage
                        .with_reader(|conn| memory_crud::get_memory(conn, next_id))?
                        .ok_or_else(|| EngramError::memory_not_found(next_id))?;
                }
            }
        }
        Err(EngramError::InvalidArgument {
            argument: "superseded_by".into(),
            reason: format!("supersession chain exceeds {SUPERSESSION_CHAIN_LIMIT}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::errors::ErrorKind;
    use engram_core::memory::MemoryKind;
    use engram_core::traits::IVectorIndex;
    use engram_embeddings::HashEmbedder;
    use engram_index::VectorIndex;

    fn controller() -> (ReconsolidationController, Arc<StorageEngine>, Arc<VectorIndex>) {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        let index = Arc::new(VectorIndex::new());
        let dual_write = Arc::new(DualWriteCoordinator::new(index.clone()));
        let embedder = Arc::new(HashEmbedder::new());
        let controller = ReconsolidationController::new(
            storage.clone(),
            dual_write,
            embedder,
            Arc::new(AdvisoryLocks::new()),
            ReconsolidationConfig::default(),
        );
        (controller, storage, index)
    }

    fn seed(storage: &StorageEngine, index: &Arc<VectorIndex>, text: &str) -> MemoryRecord {
        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, text),
            vec![],
        );
        let embedder = HashEmbedder::new();
        use engram_core::traits::IEmbeddingProvider as _;
        let embedding = embedder.embed(text).unwrap();
        let coordinator = DualWriteCoordinator::new(index.clone() as Arc<dyn IVectorIndex>);
        storage
            .with_writer(|conn| coordinator.store(conn, &memory, &embedding))
            .unwrap();
        memory
    }

    #[test]
    fn mark_labile_flips_state_and_returns_token() {
        let (controller, storage, index) = controller();
        let memory = seed(&storage, &index, "the original fact");

        let token = controller.mark_labile(&memory.id).unwrap();
        assert_eq!(token, 1);

        let loaded = storage
            .with_reader(|conn| memory_crud::get_memory(conn, &memory.id))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.consolidation_state, ConsolidationState::Labile);
    }

    #[test]
    fn update_in_window_bumps_version_and_supersedes() {
        let (controller, storage, index) = controller();
        let memory = seed(&storage, &index, "the original fact");
        let token = controller.mark_labile(&memory.id).unwrap();

        let updated = controller
            .update(
                &memory.id,
                TypedContent::from_text(MemoryKind::Semantic, "the corrected fact"),
                token,
                Some("correction"),
            )
            .unwrap();

        assert_eq!(updated.version, 2);

        let old = storage
            .with_reader(|conn| memory_crud::get_memory(conn, &memory.id))
            .unwrap()
            .unwrap();
        assert_eq!(old.superseded_by.as_deref(), Some(updated.id.as_str()));

        // Vectors swapped: old gone, new present.
        assert!(!index.contains("p1", &memory.id).unwrap());
        assert!(index.contains("p1", &updated.id).unwrap());

        // History preserved.
        let history = storage
            .with_reader(|conn| history_ops::history_for(conn, &memory.id))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].new_version, 2);
    }

    #[test]
    fn second_update_with_same_token_conflicts() {
        let (controller, storage, index) = controller();
        let memory = seed(&storage, &index, "the original fact");
        let token = controller.mark_labile(&memory.id).unwrap();

        controller
            .update(
                &memory.id,
                TypedContent::from_text(MemoryKind::Semantic, "first patch"),
                token,
                None,
            )
            .unwrap();

        let err = controller
            .update(
                &memory.id,
                TypedContent::from_text(MemoryKind::Semantic, "second patch"),
                token,
                None,
            )
            .unwrap_err();
        // Window consumed by the first update.
        assert!(matches!(
            err.kind(),
            ErrorKind::VersionConflict | ErrorKind::StoreUnavailable
        ));
    }

    #[test]
    fn update_without_labile_marking_is_rejected() {
        let (controller, storage, index) = controller();
        let memory = seed(&storage, &index, "never marked");

        let err = controller
            .update(
                &memory.id,
                TypedContent::from_text(MemoryKind::Semantic, "patch"),
                1,
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
    }

    #[test]
    fn sweep_returns_expired_items_to_consolidated() {
        let (controller, storage, index) = {
            let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
            let index = Arc::new(VectorIndex::new());
            let dual_write = Arc::new(DualWriteCoordinator::new(index.clone()));
            let controller = ReconsolidationController::new(
                storage.clone(),
                dual_write,
                Arc::new(HashEmbedder::new()),
                Arc::new(AdvisoryLocks::new()),
                ReconsolidationConfig { window_ms: 0 },
            );
            (controller, storage, index)
        };
        let memory = seed(&storage, &index, "expires instantly");
        controller.mark_labile(&memory.id).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let swept = controller.sweep_expired().unwrap();
        assert_eq!(swept, 1);

        let loaded = storage
            .with_reader(|conn| memory_crud::get_memory(conn, &memory.id))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.consolidation_state, ConsolidationState::Consolidated);
    }
}
