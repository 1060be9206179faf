//! Insert, update, get, delete for memory records, including FTS5 upkeep.
//! The FTS row is maintained in the same transaction as the base row.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::memory::{
    Confidence, ConsolidationState, MemoryKind, MemoryRecord, TypedContent, Usefulness,
};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

/// Insert a single memory. Base row and FTS row are all-or-nothing.
pub fn insert_memory(conn: &Connection, memory: &MemoryRecord) -> EngramResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert_memory begin: {e}")))?;

    match insert_memory_inner(&tx, memory) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("insert_memory commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Inner insert logic, operating on the provided connection (or transaction
/// via Deref). Exposed so the dual-write coordinator can run it inside its
/// own transaction.
pub fn insert_memory_inner(conn: &Connection, memory: &MemoryRecord) -> EngramResult<()> {
    let content_json =
        serde_json::to_string(&memory.content).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json =
        serde_json::to_string(&memory.tags).map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO memories (
            id, project_id, kind, content, tags, created_at_ms, last_accessed_ms,
            access_count, usefulness, confidence, consolidation_state, version,
            superseded_by, compression_level, content_executive, stance, content_hash
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            memory.id,
            memory.project_id,
            memory.kind.as_str(),
            content_json,
            tags_json,
            datetime_to_ms(memory.created_at),
            datetime_to_ms(memory.last_accessed),
            memory.access_count,
            memory.usefulness.value(),
            memory.confidence.value(),
            memory.consolidation_state.as_str(),
            memory.version,
            memory.superseded_by,
            memory.compression_level,
            memory.content_executive,
            memory.stance,
            memory.content_hash,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    insert_fts_row(conn, memory)?;
    Ok(())
}

fn insert_fts_row(conn: &Connection, memory: &MemoryRecord) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memories_fts (content, tags, memory_id, project_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            memory.searchable_text(),
            memory.tags.join(" "),
            memory.id,
            memory.project_id,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn delete_fts_row(conn: &Connection, memory_id: &str) -> EngramResult<()> {
    conn.execute(
        "DELETE FROM memories_fts WHERE memory_id = ?1",
        params![memory_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Get a single memory by id.
pub fn get_memory(conn: &Connection, id: &str) -> EngramResult<Option<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} FROM memories WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_memory(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match result {
        Some(Ok(memory)) => Ok(Some(memory)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Replace every mutable column of an existing memory. The FTS row is
/// rewritten so search sees the new content.
pub fn update_memory(conn: &Connection, memory: &MemoryRecord) -> EngramResult<()> {
    let content_json =
        serde_json::to_string(&memory.content).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json =
        serde_json::to_string(&memory.tags).map_err(|e| to_storage_err(e.to_string()))?;

    let changed = conn
        .execute(
            "UPDATE memories SET
                content = ?2, tags = ?3, last_accessed_ms = ?4, access_count = ?5,
                usefulness = ?6, confidence = ?7, consolidation_state = ?8,
                version = ?9, superseded_by = ?10, compression_level = ?11,
                content_executive = ?12, stance = ?13, content_hash = ?14
             WHERE id = ?1",
            params![
                memory.id,
                content_json,
                tags_json,
                datetime_to_ms(memory.last_accessed),
                memory.access_count,
                memory.usefulness.value(),
                memory.confidence.value(),
                memory.consolidation_state.as_str(),
                memory.version,
                memory.superseded_by,
                memory.compression_level,
                memory.content_executive,
                memory.stance,
                memory.content_hash,
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    if changed == 0 {
        return Err(engram_core::errors::EngramError::memory_not_found(&memory.id));
    }

    delete_fts_row(conn, &memory.id)?;
    insert_fts_row(conn, memory)?;
    Ok(())
}

/// Delete a memory row and its FTS entry. Returns whether a row existed.
pub fn delete_memory(conn: &Connection, id: &str) -> EngramResult<bool> {
    let changed = conn
        .execute("DELETE FROM memories WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    delete_fts_row(conn, id)?;
    Ok(changed > 0)
}

/// Refresh access metadata: bump count, touch last_accessed.
pub fn touch_memory(conn: &Connection, id: &str, at_ms: i64) -> EngramResult<()> {
    conn.execute(
        "UPDATE memories SET access_count = access_count + 1, last_accessed_ms = ?2 WHERE id = ?1",
        params![id, at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub(crate) const SELECT_COLUMNS: &str = "SELECT id, project_id, kind, content, tags, \
    created_at_ms, last_accessed_ms, access_count, usefulness, confidence, \
    consolidation_state, version, superseded_by, compression_level, \
    content_executive, stance, content_hash";

/// Convert a row (with `SELECT_COLUMNS` ordering) into a `MemoryRecord`.
pub(crate) fn row_to_memory(row: &rusqlite::Row<'_>) -> EngramResult<MemoryRecord> {
    let kind_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let content_json: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let state_str: String = row.get(10).map_err(|e| to_storage_err(e.to_string()))?;

    let kind = MemoryKind::parse(&kind_str)
        .ok_or_else(|| to_storage_err(format!("unknown memory kind: {kind_str}")))?;
    let content: TypedContent =
        serde_json::from_str(&content_json).map_err(|e| to_storage_err(e.to_string()))?;
    let tags: Vec<String> =
        serde_json::from_str(&tags_json).map_err(|e| to_storage_err(e.to_string()))?;
    let consolidation_state = ConsolidationState::parse(&state_str)
        .ok_or_else(|| to_storage_err(format!("unknown consolidation state: {state_str}")))?;

    let get_i64 = |idx: usize| -> EngramResult<i64> {
        row.get(idx).map_err(|e| to_storage_err(e.to_string()))
    };

    Ok(MemoryRecord {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        kind,
        content,
        tags,
        created_at: ms_to_datetime(get_i64(5)?),
        last_accessed: ms_to_datetime(get_i64(6)?),
        access_count: row.get(7).map_err(|e| to_storage_err(e.to_string()))?,
        usefulness: Usefulness::new(row.get(8).map_err(|e| to_storage_err(e.to_string()))?),
        confidence: Confidence::new(row.get(9).map_err(|e| to_storage_err(e.to_string()))?),
        consolidation_state,
        version: row.get(11).map_err(|e| to_storage_err(e.to_string()))?,
        superseded_by: row.get(12).map_err(|e| to_storage_err(e.to_string()))?,
        compression_level: row.get(13).map_err(|e| to_storage_err(e.to_string()))?,
        content_executive: row.get(14).map_err(|e| to_storage_err(e.to_string()))?,
        stance: row.get(15).map_err(|e| to_storage_err(e.to_string()))?,
        content_hash: row.get(16).map_err(|e| to_storage_err(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use engram_core::memory::TypedContent;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn semantic(project: &str, fact: &str) -> MemoryRecord {
        MemoryRecord::new(
            project,
            TypedContent::from_text(MemoryKind::Semantic, fact),
            vec!["test".into()],
        )
    }

    #[test]
    fn insert_then_get_round_trips() {
        let conn = test_conn();
        let memory = semantic("p1", "containers isolate processes");
        insert_memory(&conn, &memory).unwrap();

        let loaded = get_memory(&conn, &memory.id).unwrap().unwrap();
        assert_eq!(loaded.id, memory.id);
        assert_eq!(loaded.content, memory.content);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.kind, MemoryKind::Semantic);
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = test_conn();
        assert!(get_memory(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn update_rewrites_columns_and_fts() {
        let conn = test_conn();
        let mut memory = semantic("p1", "old fact");
        insert_memory(&conn, &memory).unwrap();

        memory.content = TypedContent::from_text(MemoryKind::Semantic, "new fact");
        memory.version = 2;
        update_memory(&conn, &memory).unwrap();

        let loaded = get_memory(&conn, &memory.id).unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.content.text(), "new fact");

        let hits = super::super::memory_search::search_keyword(&conn, "p1", "new", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn update_missing_memory_is_not_found() {
        let conn = test_conn();
        let memory = semantic("p1", "ghost");
        let err = update_memory(&conn, &memory).unwrap_err();
        assert_eq!(err.kind(), engram_core::errors::ErrorKind::NotFound);
    }

    #[test]
    fn delete_removes_row_and_fts() {
        let conn = test_conn();
        let memory = semantic("p1", "ephemeral fact");
        insert_memory(&conn, &memory).unwrap();
        assert!(delete_memory(&conn, &memory.id).unwrap());
        assert!(get_memory(&conn, &memory.id).unwrap().is_none());
        let hits =
            super::super::memory_search::search_keyword(&conn, "p1", "ephemeral", 10).unwrap();
        assert!(hits.is_empty());
        // Second delete reports no row.
        assert!(!delete_memory(&conn, &memory.id).unwrap());
    }

    #[test]
    fn touch_bumps_access_count() {
        let conn = test_conn();
        let memory = semantic("p1", "touched");
        insert_memory(&conn, &memory).unwrap();
        touch_memory(&conn, &memory.id, 123_456).unwrap();
        let loaded = get_memory(&conn, &memory.id).unwrap().unwrap();
        assert_eq!(loaded.access_count, 1);
        assert_eq!(loaded.last_accessed.timestamp_millis(), 123_456);
    }
}
