//! v001: projects, memories (+FTS5), events, archive, update history.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            path TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            deleted INTEGER NOT NULL DEFAULT 0,
            memory_count INTEGER NOT NULL DEFAULT 0,
            event_count INTEGER NOT NULL DEFAULT 0,
            procedure_count INTEGER NOT NULL DEFAULT 0,
            entity_count INTEGER NOT NULL DEFAULT 0,
            quota_flagged INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE memories (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            last_accessed_ms INTEGER NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            usefulness REAL NOT NULL DEFAULT 0,
            confidence REAL NOT NULL DEFAULT 1,
            consolidation_state TEXT NOT NULL DEFAULT 'unconsolidated',
            version INTEGER NOT NULL DEFAULT 1,
            superseded_by TEXT,
            compression_level INTEGER NOT NULL DEFAULT 0,
            content_executive TEXT,
            stance REAL NOT NULL DEFAULT 0,
            content_hash TEXT NOT NULL
        );
        CREATE INDEX idx_memories_project ON memories(project_id);
        CREATE INDEX idx_memories_kind ON memories(project_id, kind);
        CREATE INDEX idx_memories_superseded ON memories(superseded_by);
        CREATE INDEX idx_memories_hash ON memories(content_hash);
        CREATE INDEX idx_memories_state ON memories(project_id, consolidation_state);

        CREATE VIRTUAL TABLE memories_fts USING fts5(
            content,
            tags,
            memory_id UNINDEXED,
            project_id UNINDEXED
        );

        CREATE TABLE events (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            session TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            content TEXT NOT NULL,
            outcome TEXT,
            context TEXT NOT NULL,
            learning_delta REAL NOT NULL DEFAULT 0,
            surprise REAL NOT NULL DEFAULT 0,
            access_count INTEGER NOT NULL DEFAULT 0,
            confidence REAL NOT NULL DEFAULT 1,
            consolidation_status TEXT NOT NULL DEFAULT 'pending'
        );
        CREATE INDEX idx_events_project_time ON events(project_id, timestamp_ms);
        CREATE INDEX idx_events_status ON events(project_id, consolidation_status);

        CREATE TABLE memory_archive (
            memory_id TEXT PRIMARY KEY,
            original_content BLOB NOT NULL,
            archived_at_ms INTEGER NOT NULL
        );

        CREATE TABLE update_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            memory_id TEXT NOT NULL,
            old_version INTEGER NOT NULL,
            new_version INTEGER NOT NULL,
            patched_at_ms INTEGER NOT NULL,
            reason TEXT
        );
        CREATE INDEX idx_history_memory ON update_history(memory_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
