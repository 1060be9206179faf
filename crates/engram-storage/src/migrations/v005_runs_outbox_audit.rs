//! v005: consolidation runs, patterns, outbox, audit log.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE consolidation_runs (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            started_at_ms INTEGER NOT NULL,
            finished_at_ms INTEGER,
            status TEXT NOT NULL DEFAULT 'running',
            metrics TEXT NOT NULL,
            phase_failures TEXT NOT NULL,
            metric_misses TEXT NOT NULL
        );
        CREATE INDEX idx_runs_project ON consolidation_runs(project_id, started_at_ms);

        CREATE TABLE patterns (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            pattern_type TEXT NOT NULL,
            content TEXT NOT NULL,
            confidence REAL NOT NULL,
            occurrences INTEGER NOT NULL,
            source_events TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_patterns_run ON patterns(run_id);

        CREATE TABLE outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            op TEXT NOT NULL,
            memory_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            operation TEXT NOT NULL,
            actor TEXT NOT NULL,
            detail TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_audit_entity ON audit_log(entity_kind, entity_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
