//! Listing and filtering queries over memories. Superseded records are
//! excluded unless the caller asks for them.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryKind, MemoryRecord};

use super::memory_crud::{row_to_memory, SELECT_COLUMNS};
use crate::to_storage_err;

fn collect_rows(stmt: &mut rusqlite::Statement<'_>, params: &[&dyn rusqlite::ToSql]) -> EngramResult<Vec<MemoryRecord>> {
    let rows = stmt
        .query_map(params, |row| Ok(row_to_memory(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

/// Current (non-superseded) memories for a project, newest first.
pub fn list_memories(
    conn: &Connection,
    project_id: &str,
    kind: Option<MemoryKind>,
) -> EngramResult<Vec<MemoryRecord>> {
    match kind {
        Some(kind) => {
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS} FROM memories
                     WHERE project_id = ?1 AND kind = ?2 AND superseded_by IS NULL
                     ORDER BY created_at_ms DESC"
                ))
                .map_err(|e| to_storage_err(e.to_string()))?;
            collect_rows(&mut stmt, &[&project_id, &kind.as_str()])
        }
        None => {
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS} FROM memories
                     WHERE project_id = ?1 AND superseded_by IS NULL
                     ORDER BY created_at_ms DESC"
                ))
                .map_err(|e| to_storage_err(e.to_string()))?;
            collect_rows(&mut stmt, &[&project_id])
        }
    }
}

/// Bulk fetch by ids, preserving only rows that exist.
pub fn get_memories(conn: &Connection, ids: &[String]) -> EngramResult<Vec<MemoryRecord>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(memory) = super::memory_crud::get_memory(conn, id)? {
            out.push(memory);
        }
    }
    Ok(out)
}

/// Memories whose content hash matches (exact-content dedup lookup).
pub fn find_by_content_hash(
    conn: &Connection,
    project_id: &str,
    content_hash: &str,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_COLUMNS} FROM memories
             WHERE project_id = ?1 AND content_hash = ?2 AND superseded_by IS NULL"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect_rows(&mut stmt, &[&project_id, &content_hash])
}

/// Memories in a consolidation state.
pub fn list_by_state(
    conn: &Connection,
    project_id: &str,
    state: &str,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_COLUMNS} FROM memories
             WHERE project_id = ?1 AND consolidation_state = ?2 AND superseded_by IS NULL
             ORDER BY created_at_ms ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect_rows(&mut stmt, &[&project_id, &state])
}

/// Memories created before `cutoff_ms` whose compression level is below
/// `max_level`. Candidates for the compression phase.
pub fn list_compression_candidates(
    conn: &Connection,
    project_id: &str,
    cutoff_ms: i64,
    max_level: u8,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_COLUMNS} FROM memories
             WHERE project_id = ?1 AND created_at_ms <= ?2
               AND compression_level < ?3 AND superseded_by IS NULL
             ORDER BY created_at_ms ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect_rows(&mut stmt, &[&project_id, &cutoff_ms, &max_level])
}

/// Count current memories per project.
pub fn count_memories(conn: &Connection, project_id: &str) -> EngramResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE project_id = ?1 AND superseded_by IS NULL",
        params![project_id],
        |row| row.get::<_, u64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// All memory ids for a project, for reconciliation with the vector index.
pub fn all_memory_ids(conn: &Connection, project_id: &str) -> EngramResult<Vec<(String, i64)>> {
    let mut stmt = conn
        .prepare("SELECT id, created_at_ms FROM memories WHERE project_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use crate::queries::memory_crud::insert_memory;
    use engram_core::memory::TypedContent;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    fn store(conn: &Connection, project: &str, kind: MemoryKind, text: &str) -> MemoryRecord {
        let memory = MemoryRecord::new(project, TypedContent::from_text(kind, text), vec![]);
        insert_memory(conn, &memory).unwrap();
        memory
    }

    #[test]
    fn list_filters_by_kind() {
        let conn = test_conn();
        store(&conn, "p1", MemoryKind::Semantic, "fact one");
        store(&conn, "p1", MemoryKind::Procedural, "how to deploy");

        let semantic = list_memories(&conn, "p1", Some(MemoryKind::Semantic)).unwrap();
        assert_eq!(semantic.len(), 1);
        let all = list_memories(&conn, "p1", None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn superseded_memories_are_hidden() {
        let conn = test_conn();
        let mut old = store(&conn, "p1", MemoryKind::Semantic, "old version");
        old.superseded_by = Some("newer".into());
        crate::queries::memory_crud::update_memory(&conn, &old).unwrap();

        let visible = list_memories(&conn, "p1", None).unwrap();
        assert!(visible.is_empty());
        assert_eq!(count_memories(&conn, "p1").unwrap(), 0);
    }

    #[test]
    fn content_hash_lookup_finds_duplicates() {
        let conn = test_conn();
        let memory = store(&conn, "p1", MemoryKind::Semantic, "identical");
        let twins = find_by_content_hash(&conn, "p1", &memory.content_hash).unwrap();
        assert_eq!(twins.len(), 1);
        assert!(find_by_content_hash(&conn, "p2", &memory.content_hash)
            .unwrap()
            .is_empty());
    }
}
