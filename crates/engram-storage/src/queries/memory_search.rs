//! Full-text (FTS5/BM25) and temporal range search over memories.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;

use super::memory_crud;
use crate::to_storage_err;

/// BM25-ranked keyword search. Returns (memory, score) with score mapped
/// so higher is better (bm25() returns lower-is-better).
pub fn search_keyword(
    conn: &Connection,
    project_id: &str,
    query: &str,
    limit: usize,
) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    if query.trim().is_empty() {
        return Ok(vec![]);
    }

    let fts_query = sanitize_fts_query(query);
    if fts_query.is_empty() {
        return Ok(vec![]);
    }

    let mut stmt = conn
        .prepare(
            "SELECT memory_id, bm25(memories_fts) AS rank
             FROM memories_fts
             WHERE memories_fts MATCH ?1 AND project_id = ?2
             ORDER BY rank
             LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![fts_query, project_id, limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (memory_id, rank) = row.map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(memory) = memory_crud::get_memory(conn, &memory_id)? {
            if memory.is_current() {
                // bm25 rank is negative-ish, lower = better; flip into a
                // positive higher-is-better score.
                out.push((memory, -rank));
            }
        }
    }
    Ok(out)
}

/// Memories whose creation or last access falls in [from_ms, to_ms],
/// most recent first.
pub fn search_temporal(
    conn: &Connection,
    project_id: &str,
    from_ms: i64,
    to_ms: i64,
    limit: usize,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "{} FROM memories
             WHERE project_id = ?1 AND superseded_by IS NULL
               AND (created_at_ms BETWEEN ?2 AND ?3
                    OR last_accessed_ms BETWEEN ?2 AND ?3)
             ORDER BY created_at_ms DESC
             LIMIT ?4",
            memory_crud::SELECT_COLUMNS
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![project_id, from_ms, to_ms, limit], |row| {
            Ok(memory_crud::row_to_memory(row))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

/// Quote each token so FTS5 treats user text literally (no operators).
fn sanitize_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| {
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            format!("\"{cleaned}\"")
        })
        .filter(|t| t.len() > 2)
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use crate::queries::memory_crud::insert_memory;
    use engram_core::memory::{MemoryKind, TypedContent};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn store(conn: &Connection, text: &str) -> MemoryRecord {
        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, text),
            vec![],
        );
        insert_memory(conn, &memory).unwrap();
        memory
    }

    #[test]
    fn keyword_search_finds_matching_content() {
        let conn = test_conn();
        let docker = store(&conn, "Docker containers provide process isolation");
        store(&conn, "Postgres uses MVCC for concurrency");

        let hits = search_keyword(&conn, "p1", "docker isolation", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, docker.id);
        assert!(hits[0].1.is_finite());
    }

    #[test]
    fn empty_query_returns_empty_not_error() {
        let conn = test_conn();
        store(&conn, "anything");
        assert!(search_keyword(&conn, "p1", "", 10).unwrap().is_empty());
        assert!(search_keyword(&conn, "p1", "   ", 10).unwrap().is_empty());
    }

    #[test]
    fn fts_operators_are_neutralized() {
        let conn = test_conn();
        store(&conn, "plain content");
        // Would be a syntax error if passed through raw.
        let hits = search_keyword(&conn, "p1", "content* NEAR/3 (", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn temporal_search_respects_range() {
        let conn = test_conn();
        let memory = store(&conn, "recent happening");
        let now = memory.created_at.timestamp_millis();

        let hits = search_temporal(&conn, "p1", now - 1000, now + 1000, 10).unwrap();
        assert_eq!(hits.len(), 1);

        let none = search_temporal(&conn, "p1", now - 10_000, now - 5_000, 10).unwrap();
        assert!(none.is_empty());
    }
}
