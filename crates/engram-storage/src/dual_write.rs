//! Dual-write coordinator keeping the relational store and the vector
//! index consistent.
//!
//! `store`: begin relational tx → insert row → upsert vector → commit.
//! An index failure rolls the row back and surfaces `IndexUnavailable`.
//! A commit failure after a successful index write triggers a
//! compensating index delete; if that also fails, an outbox row records
//! the orphan for the reconciliation sweeper.
//!
//! `forget` is the inverse with the same failure handling.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::MemoryRecord;
use engram_core::models::{AuditActor, OutboxOp};
use engram_core::traits::IVectorIndex;

use crate::audit::AuditLogger;
use crate::queries::{memory_crud, outbox_ops};
use crate::to_storage_err;

/// Coordinates one relational connection and the vector index.
pub struct DualWriteCoordinator {
    index: Arc<dyn IVectorIndex>,
}

impl DualWriteCoordinator {
    pub fn new(index: Arc<dyn IVectorIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<dyn IVectorIndex> {
        &self.index
    }

    /// Store a memory and its embedding atomically across both stores.
    ///
    /// The relational transaction is opened before any index call; no
    /// index write happens without an open transaction.
    pub fn store(
        &self,
        conn: &Connection,
        memory: &MemoryRecord,
        embedding: &[f32],
    ) -> EngramResult<()> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| to_storage_err(format!("dual-write begin: {e}")))?;

        memory_crud::insert_memory_inner(&tx, memory)?;
        AuditLogger::log_create(&tx, &memory.id, AuditActor::System)?;

        // Index upsert inside the open transaction scope.
        if let Err(e) = self
            .index
            .upsert(&memory.project_id, &memory.id, embedding)
        {
            let _ = tx.rollback();
            return Err(EngramError::IndexUnavailable {
                reason: e.to_string(),
            });
        }

        if let Err(commit_err) = tx.commit() {
            // Compensate: the index holds a vector for a row that never
            // landed.
            if let Err(comp_err) = self.index.delete(&memory.project_id, &memory.id) {
                warn!(
                    memory_id = %memory.id,
                    error = %comp_err,
                    "dual-write compensation failed, enqueueing outbox entry"
                );
                outbox_ops::enqueue(
                    conn,
                    OutboxOp::IndexDelete,
                    &memory.id,
                    &memory.project_id,
                    Utc::now().timestamp_millis(),
                )?;
            }
            return Err(EngramError::StoreUnavailable {
                reason: format!("commit failed: {commit_err}"),
            });
        }

        Ok(())
    }

    /// Forget a memory from both stores.
    ///
    /// The index delete runs inside the relational transaction; if the
    /// index is down the row survives and the caller sees
    /// `IndexUnavailable`. A failed commit re-inserts nothing: the vector
    /// is already gone, so an outbox upsert entry restores it later.
    pub fn forget(
        &self,
        conn: &Connection,
        memory: &MemoryRecord,
    ) -> EngramResult<bool> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| to_storage_err(format!("dual-write forget begin: {e}")))?;

        let existed = memory_crud::delete_memory(&tx, &memory.id)?;
        if !existed {
            let _ = tx.rollback();
            return Ok(false);
        }
        AuditLogger::log_forget(&tx, &memory.id, AuditActor::System)?;

        if let Err(e) = self.index.delete(&memory.project_id, &memory.id) {
            let _ = tx.rollback();
            return Err(EngramError::IndexUnavailable {
                reason: e.to_string(),
            });
        }

        if let Err(commit_err) = tx.commit() {
            // Vector already deleted but the row survived the rollback.
            // Record the inconsistency for the sweeper.
            outbox_ops::enqueue(
                conn,
                OutboxOp::IndexUpsert,
                &memory.id,
                &memory.project_id,
                Utc::now().timestamp_millis(),
            )?;
            return Err(EngramError::StoreUnavailable {
                reason: format!("commit failed: {commit_err}"),
            });
        }

        info!(memory_id = %memory.id, "memory forgotten from both stores");
        Ok(true)
    }

    /// Swap vectors during reconsolidation: delete the old entry, insert
    /// the new one. Runs inside the caller's transaction scope.
    pub fn swap_vector(
        &self,
        project_id: &str,
        old_id: &str,
        new_id: &str,
        embedding: &[f32],
    ) -> EngramResult<()> {
        self.index
            .delete(project_id, old_id)
            .map_err(|e| EngramError::IndexUnavailable {
                reason: e.to_string(),
            })?;
        self.index
            .upsert(project_id, new_id, embedding)
            .map_err(|e| EngramError::IndexUnavailable {
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use engram_core::errors::ErrorKind;
    use engram_core::memory::{MemoryKind, TypedContent};
    use engram_index::VectorIndex;

    fn setup() -> (Connection, DualWriteCoordinator, Arc<VectorIndex>) {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        let index = Arc::new(VectorIndex::with_dimensions(4));
        let coordinator = DualWriteCoordinator::new(index.clone());
        (conn, coordinator, index)
    }

    fn memory(text: &str) -> MemoryRecord {
        MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, text),
            vec![],
        )
    }

    #[test]
    fn store_writes_both_sides() {
        let (conn, coordinator, index) = setup();
        let m = memory("dual written");
        coordinator.store(&conn, &m, &[1.0, 0.0, 0.0, 0.0]).unwrap();

        assert!(memory_crud::get_memory(&conn, &m.id).unwrap().is_some());
        assert!(index.contains("p1", &m.id).unwrap());
    }

    #[test]
    fn index_failure_rolls_back_the_row() {
        let (conn, coordinator, index) = setup();
        index.set_available(false);

        let m = memory("never lands");
        let err = coordinator
            .store(&conn, &m, &[1.0, 0.0, 0.0, 0.0])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);

        // The relational row does not exist afterwards.
        assert!(memory_crud::get_memory(&conn, &m.id).unwrap().is_none());
    }

    #[test]
    fn forget_removes_both_sides() {
        let (conn, coordinator, index) = setup();
        let m = memory("to be forgotten");
        coordinator.store(&conn, &m, &[1.0, 0.0, 0.0, 0.0]).unwrap();

        assert!(coordinator.forget(&conn, &m).unwrap());
        assert!(memory_crud::get_memory(&conn, &m.id).unwrap().is_none());
        assert!(!index.contains("p1", &m.id).unwrap());
    }

    #[test]
    fn forget_with_index_down_keeps_the_row() {
        let (conn, coordinator, index) = setup();
        let m = memory("sticky");
        coordinator.store(&conn, &m, &[1.0, 0.0, 0.0, 0.0]).unwrap();

        index.set_available(false);
        let err = coordinator.forget(&conn, &m).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);
        assert!(memory_crud::get_memory(&conn, &m.id).unwrap().is_some());
    }

    #[test]
    fn forget_missing_memory_reports_false() {
        let (conn, coordinator, _) = setup();
        let m = memory("ghost");
        assert!(!coordinator.forget(&conn, &m).unwrap());
    }
}
