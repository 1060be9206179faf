//! Memory operations: project lifecycle, store, update, forget.

use chrono::Utc;
use tracing::info;

use engram_core::deadline::Deadline;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{ConsolidationState, MemoryKind, MemoryRecord, TypedContent};
use engram_core::models::Project;
use engram_core::traits::IVectorIndex as _;
use engram_storage::queries::{memory_crud, memory_query, project_ops};

use crate::Engine;

impl Engine {
    /// Create a project. Names are unique; a duplicate fails at the
    /// relational layer.
    pub fn create_project(&self, name: &str, path: &str) -> EngramResult<Project> {
        let project = Project::new(name, path);
        self.storage
            .with_writer(|conn| project_ops::insert_project(conn, &project))?;
        info!(project_id = %project.id, name, "project created");
        Ok(project)
    }

    pub fn get_project(&self, name: &str) -> EngramResult<Option<Project>> {
        self.storage
            .with_reader(|conn| project_ops::get_project_by_name(conn, name))
    }

    /// Store a memory: quota check, embed, dual-write, counter bump,
    /// cache invalidation.
    pub fn store(
        &self,
        project_id: &str,
        content: TypedContent,
        tags: Vec<String>,
        deadline: Deadline,
    ) -> EngramResult<String> {
        deadline.check("store")?;
        self.check_memory_quota(project_id)?;

        let record = MemoryRecord::new(project_id, content, tags);
        let embedding = self.embedder.embed(record.searchable_text())?;
        deadline.check("store")?;

        let lock = self.locks.memory(&record.id);
        let _guard = lock.lock().expect("memory lock poisoned");
        self.storage
            .with_writer(|conn| self.dual_write.store(conn, &record, &embedding))?;
        self.storage.with_writer(|conn| {
            project_ops::bump_counter(conn, project_id, project_ops::Counter::Memories, 1)
                .or(Ok(()))
        })?;

        self.router.cache().invalidate_for("store");
        Ok(record.id)
    }

    /// Convenience: store plain text of a kind.
    pub fn store_text(
        &self,
        project_id: &str,
        text: &str,
        kind: MemoryKind,
        tags: Vec<String>,
        deadline: Deadline,
    ) -> EngramResult<String> {
        self.store(
            project_id,
            TypedContent::from_text(kind, text),
            tags,
            deadline,
        )
    }

    /// Versioned update. Labile memories route through the
    /// reconsolidation controller; everything else is an in-place
    /// versioned rewrite. A mismatched `expected_version` fails with
    /// `VersionConflict` either way.
    pub fn update(
        &self,
        memory_id: &str,
        patch: TypedContent,
        expected_version: u64,
        deadline: Deadline,
    ) -> EngramResult<u64> {
        deadline.check("update")?;

        let current = self
            .storage
            .with_reader(|conn| memory_crud::get_memory(conn, memory_id))?
            .ok_or_else(|| EngramError::memory_not_found(memory_id))?;

        if current.consolidation_state == ConsolidationState::Labile {
            let updated = self.recon.update(memory_id, patch, expected_version, None)?;
            self.router.cache().invalidate_for("update");
            return Ok(updated.version);
        }

        let lock = self.locks.memory(memory_id);
        let _guard = lock.lock().expect("memory lock poisoned");

        // Re-read under the lock; the version may have moved.
        let mut record = self
            .storage
            .with_reader(|conn| memory_crud::get_memory(conn, memory_id))?
            .ok_or_else(|| EngramError::memory_not_found(memory_id))?;
        // A superseded row is never updatable; report the head version so
        // the caller can reconcile.
        if record.superseded_by.is_some() {
            let head = self.resolve_head(&record)?;
            return Err(EngramError::VersionConflict {
                id: memory_id.to_string(),
                expected: expected_version,
                actual: head.version,
            });
        }
        if record.version != expected_version {
            return Err(EngramError::VersionConflict {
                id: memory_id.to_string(),
                expected: expected_version,
                actual: record.version,
            });
        }

        record.content = patch;
        record.content_hash = MemoryRecord::compute_content_hash(&record.content);
        record.version += 1;
        record.last_accessed = Utc::now();

        let embedding = self.embedder.embed(record.searchable_text())?;
        deadline.check("update")?;

        self.storage.with_writer(|conn| {
            memory_crud::update_memory(conn, &record)?;
            self.dual_write
                .index()
                .upsert(&record.project_id, &record.id, &embedding)
                .map_err(|e| EngramError::IndexUnavailable {
                    reason: e.to_string(),
                })?;
            Ok(())
        })?;

        self.router.cache().invalidate_for("update");
        Ok(record.version)
    }

    /// Forget a memory from both stores. Returns NotFound when no such
    /// memory exists.
    pub fn forget(&self, memory_id: &str, deadline: Deadline) -> EngramResult<()> {
        deadline.check("forget")?;

        let record = self
            .storage
            .with_reader(|conn| memory_crud::get_memory(conn, memory_id))?
            .ok_or_else(|| EngramError::memory_not_found(memory_id))?;

        let lock = self.locks.memory(memory_id);
        let _guard = lock.lock().expect("memory lock poisoned");

        let existed = self
            .storage
            .with_writer(|conn| self.dual_write.forget(conn, &record))?;
        if !existed {
            return Err(EngramError::memory_not_found(memory_id));
        }

        self.network.unlink(memory_id)?;
        self.storage.with_writer(|conn| {
            project_ops::bump_counter(
                conn,
                &record.project_id,
                project_ops::Counter::Memories,
                -1,
            )
            .or(Ok(()))
        })?;
        self.router.cache().invalidate_for("forget");
        Ok(())
    }

    pub fn get_memory(&self, memory_id: &str) -> EngramResult<Option<MemoryRecord>> {
        self.storage
            .with_reader(|conn| memory_crud::get_memory(conn, memory_id))
    }

    /// Follow the supersession chain to the current head, bounded.
    fn resolve_head(&self, memory: &MemoryRecord) -> EngramResult<MemoryRecord> {
        use engram_core::constants::SUPERSESSION_CHAIN_LIMIT;
        let mut current = memory.clone();
        for _ in 0..SUPERSESSION_CHAIN_LIMIT {
            match current.superseded_by.clone() {
                None => return Ok(current),
                Some(next_id) => {
                    current = self
                        .storage
                        .with_reader(|conn| memory_crud::get_memory(conn, &next_id))?
                        .ok_or_else(|| EngramError::memory_not_found(&next_id))?;
                }
            }
        }
        Err(EngramError::InvalidArgument {
            argument: "superseded_by".into(),
            reason: format!("supersession chain exceeds {SUPERSESSION_CHAIN_LIMIT}"),
        })
    }

    fn check_memory_quota(&self, project_id: &str) -> EngramResult<()> {
        let used = self
            .storage
            .with_reader(|conn| memory_query::count_memories(conn, project_id))?;
        let limit = self.config.quota.max_memories;
        if used >= limit {
            self.storage
                .with_writer(|conn| project_ops::flag_quota(conn, project_id))
                .ok();
            return Err(EngramError::QuotaExceeded {
                project_id: project_id.to_string(),
                resource: "memories",
                used,
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::config::EngramConfig;
    use engram_core::errors::ErrorKind;

    fn engine() -> Engine {
        Engine::builder().build().unwrap()
    }

    #[test]
    fn store_then_get_round_trips() {
        let engine = engine();
        let id = engine
            .store_text(
                "p1",
                "Docker containers provide process isolation",
                MemoryKind::Semantic,
                vec!["docker".into()],
                Deadline::none(),
            )
            .unwrap();

        let memory = engine.get_memory(&id).unwrap().unwrap();
        assert_eq!(memory.kind, MemoryKind::Semantic);
        assert_eq!(memory.version, 1);
    }

    #[test]
    fn update_bumps_version_and_double_update_conflicts() {
        let engine = engine();
        let id = engine
            .store_text("p1", "v1 fact", MemoryKind::Semantic, vec![], Deadline::none())
            .unwrap();

        let v2 = engine
            .update(
                &id,
                TypedContent::from_text(MemoryKind::Semantic, "v2 fact"),
                1,
                Deadline::none(),
            )
            .unwrap();
        assert_eq!(v2, 2);

        let err = engine
            .update(
                &id,
                TypedContent::from_text(MemoryKind::Semantic, "v2 again"),
                1,
                Deadline::none(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert_eq!(err.conflict_version(), Some(2));
    }

    #[test]
    fn forget_removes_everywhere_and_second_forget_is_not_found() {
        let engine = engine();
        let id = engine
            .store_text("p1", "ephemeral", MemoryKind::Episodic, vec![], Deadline::none())
            .unwrap();

        engine.forget(&id, Deadline::none()).unwrap();
        assert!(engine.get_memory(&id).unwrap().is_none());
        assert!(!engine.index().contains("p1", &id).unwrap());

        let err = engine.forget(&id, Deadline::none()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn quota_blocks_store_and_flags_project() {
        let config =
            EngramConfig::from_toml("[quota]\nmax_memories = 1\n").unwrap();
        let engine = Engine::builder().config(config).build().unwrap();
        let project = engine.create_project("demo", "/tmp/demo").unwrap();

        engine
            .store_text(&project.id, "first", MemoryKind::Semantic, vec![], Deadline::none())
            .unwrap();
        let err = engine
            .store_text(&project.id, "second", MemoryKind::Semantic, vec![], Deadline::none())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QuotaExceeded);

        let flagged = engine.get_project("demo").unwrap().unwrap();
        assert!(flagged.quota_flagged);
    }

    #[test]
    fn store_with_index_down_leaves_no_row() {
        let engine = engine();
        engine.index().set_available(false);

        let err = engine
            .store_text("p1", "never lands", MemoryKind::Semantic, vec![], Deadline::none())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);

        engine.index().set_available(true);
        let hits = engine
            .storage
            .with_reader(|conn| {
                engram_storage::queries::memory_search::search_keyword(conn, "p1", "lands", 10)
            })
            .unwrap();
        assert!(hits.is_empty());
    }
}
