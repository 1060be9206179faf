//! v004: entities, relations, rules, approvals, snapshots.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE entities (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            observations TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            UNIQUE (project_id, name)
        );

        CREATE TABLE relations (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            from_entity TEXT NOT NULL,
            to_entity TEXT NOT NULL,
            relation_type TEXT NOT NULL,
            strength REAL NOT NULL DEFAULT 0.5,
            confidence REAL NOT NULL DEFAULT 1,
            valid_from_ms INTEGER NOT NULL,
            valid_until_ms INTEGER,
            UNIQUE (project_id, from_entity, to_entity, relation_type)
        );
        CREATE INDEX idx_relations_from ON relations(from_entity);
        CREATE INDEX idx_relations_to ON relations(to_entity);

        CREATE TABLE rules (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            category TEXT NOT NULL,
            rule_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            condition_text TEXT NOT NULL,
            exception_text TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            auto_block INTEGER NOT NULL DEFAULT 0,
            can_override INTEGER NOT NULL DEFAULT 1,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_rules_project ON rules(project_id, enabled);

        CREATE TABLE approval_requests (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            change TEXT NOT NULL,
            confidence REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            pre_snapshot_id TEXT NOT NULL,
            post_snapshot_id TEXT,
            created_at_ms INTEGER NOT NULL,
            decided_at_ms INTEGER,
            decided_by TEXT
        );
        CREATE INDEX idx_approvals_project ON approval_requests(project_id, status);

        CREATE TABLE change_snapshots (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            target TEXT NOT NULL,
            state TEXT NOT NULL,
            taken_at_ms INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
