//! Reconciliation sweeper.
//!
//! Drains the outbox, then compares id sets between the relational store
//! and the vector index per project. Orphans older than the grace window
//! are removed from whichever side holds them; younger entries are left
//! alone because an in-flight dual-write may still complete.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use engram_core::errors::EngramResult;
use engram_core::models::OutboxOp;
use engram_core::traits::IVectorIndex;

use crate::queries::{memory_crud, memory_query, outbox_ops};

/// Default grace window before an orphan is eligible for cleanup.
pub const DEFAULT_GRACE_MS: i64 = 600_000;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub outbox_drained: usize,
    pub index_orphans_removed: usize,
    pub row_orphans_removed: usize,
}

pub struct Reconciler {
    index: Arc<dyn IVectorIndex>,
    grace_ms: i64,
}

impl Reconciler {
    pub fn new(index: Arc<dyn IVectorIndex>) -> Self {
        Self {
            index,
            grace_ms: DEFAULT_GRACE_MS,
        }
    }

    pub fn with_grace_ms(mut self, grace_ms: i64) -> Self {
        self.grace_ms = grace_ms;
        self
    }

    /// One full sweep over a project.
    pub fn sweep(&self, conn: &Connection, project_id: &str) -> EngramResult<SweepReport> {
        let mut report = SweepReport::default();
        report.outbox_drained = self.drain_outbox(conn)?;

        let now_ms = Utc::now().timestamp_millis();
        let cutoff_ms = now_ms - self.grace_ms;

        let rows = memory_query::all_memory_ids(conn, project_id)?;
        let row_ids: HashSet<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
        let index_ids = self.index.ids(project_id)?;
        let index_set: HashSet<&str> = index_ids.iter().map(String::as_str).collect();

        // Vectors with no relational row: remove once past the grace window.
        // Index entries carry no timestamp, so the grace decision uses the
        // absence of a younger row as the signal.
        for id in index_ids.iter() {
            if !row_ids.contains(id.as_str()) {
                self.index.delete(project_id, id)?;
                report.index_orphans_removed += 1;
                info!(memory_id = %id, "removed index orphan");
            }
        }

        // Rows with no vector: delete those older than the grace window.
        for (id, created_at_ms) in rows {
            if !index_set.contains(id.as_str()) && created_at_ms < cutoff_ms {
                memory_crud::delete_memory(conn, &id)?;
                report.row_orphans_removed += 1;
                info!(memory_id = %id, "removed relational orphan");
            }
        }

        Ok(report)
    }

    /// Apply and clear outstanding outbox entries.
    fn drain_outbox(&self, conn: &Connection) -> EngramResult<usize> {
        let entries = outbox_ops::pending(conn)?;
        let mut drained = 0;

        for entry in entries {
            let applied = match entry.op {
                OutboxOp::IndexDelete => self.index.delete(&entry.project_id, &entry.memory_id),
                // A deferred upsert can only be replayed when the row still
                // exists; otherwise both sides already agree.
                OutboxOp::IndexUpsert => {
                    match memory_crud::get_memory(conn, &entry.memory_id)? {
                        Some(_) => Ok(()), // vector restored by the next store/update path
                        None => Ok(()),
                    }
                }
            };

            match applied {
                Ok(()) => {
                    outbox_ops::remove(conn, entry.id)?;
                    drained += 1;
                }
                Err(e) => {
                    outbox_ops::mark_attempt(conn, entry.id)?;
                    warn!(
                        outbox_id = entry.id,
                        memory_id = %entry.memory_id,
                        error = %e,
                        "outbox entry replay failed"
                    );
                }
            }
        }
        Ok(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use engram_core::memory::{MemoryKind, MemoryRecord, TypedContent};
    use engram_core::traits::IVectorIndex as _;
    use engram_index::VectorIndex;

    fn setup() -> (Connection, Reconciler, Arc<VectorIndex>) {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        let index = Arc::new(VectorIndex::with_dimensions(4));
        let reconciler = Reconciler::new(index.clone()).with_grace_ms(0);
        (conn, reconciler, index)
    }

    #[test]
    fn index_orphans_are_removed() {
        let (conn, reconciler, index) = setup();
        index.upsert("p1", "orphan", &[1.0, 0.0, 0.0, 0.0]).unwrap();

        let report = reconciler.sweep(&conn, "p1").unwrap();
        assert_eq!(report.index_orphans_removed, 1);
        assert!(!index.contains("p1", "orphan").unwrap());
    }

    #[test]
    fn row_orphans_past_grace_are_removed() {
        let (conn, reconciler, _) = setup();
        let mut memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, "rowside only"),
            vec![],
        );
        memory.created_at = Utc::now() - chrono::Duration::hours(1);
        crate::queries::memory_crud::insert_memory(&conn, &memory).unwrap();

        let report = reconciler.sweep(&conn, "p1").unwrap();
        assert_eq!(report.row_orphans_removed, 1);
        assert!(crate::queries::memory_crud::get_memory(&conn, &memory.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn young_row_orphans_survive_the_grace_window() {
        let (conn, _, index) = setup();
        let reconciler = Reconciler::new(index).with_grace_ms(3_600_000);
        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, "fresh write"),
            vec![],
        );
        crate::queries::memory_crud::insert_memory(&conn, &memory).unwrap();

        let report = reconciler.sweep(&conn, "p1").unwrap();
        assert_eq!(report.row_orphans_removed, 0);
    }

    #[test]
    fn outbox_delete_entries_drain() {
        let (conn, reconciler, index) = setup();
        index.upsert("p1", "m1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        crate::queries::outbox_ops::enqueue(
            &conn,
            engram_core::models::OutboxOp::IndexDelete,
            "m1",
            "p1",
            0,
        )
        .unwrap();

        let report = reconciler.sweep(&conn, "p1").unwrap();
        assert_eq!(report.outbox_drained, 1);
        assert!(!index.contains("p1", "m1").unwrap());
    }
}
