//! v002: working items, association links, priming, inhibition.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE working_items (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            content TEXT NOT NULL,
            component TEXT NOT NULL,
            activation REAL NOT NULL DEFAULT 1,
            importance REAL NOT NULL DEFAULT 0,
            decay_rate REAL NOT NULL DEFAULT 0.1,
            created_at_ms INTEGER NOT NULL,
            last_accessed_ms INTEGER NOT NULL,
            pinned INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX idx_working_project ON working_items(project_id);

        CREATE TABLE association_links (
            from_id TEXT NOT NULL,
            from_layer TEXT NOT NULL,
            to_id TEXT NOT NULL,
            to_layer TEXT NOT NULL,
            link_type TEXT NOT NULL,
            strength REAL NOT NULL DEFAULT 0,
            co_occurrence_count INTEGER NOT NULL DEFAULT 0,
            last_strengthened_ms INTEGER NOT NULL,
            PRIMARY KEY (from_id, to_id, link_type)
        );
        CREATE INDEX idx_links_from ON association_links(from_id);
        CREATE INDEX idx_links_to ON association_links(to_id);

        CREATE TABLE priming (
            item_id TEXT PRIMARY KEY,
            strength REAL NOT NULL,
            expires_at_ms INTEGER NOT NULL
        );

        CREATE TABLE inhibition (
            item_id TEXT PRIMARY KEY,
            strength REAL NOT NULL,
            inhibition_type TEXT NOT NULL,
            expires_at_ms INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
