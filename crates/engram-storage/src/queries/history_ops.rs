//! Reconsolidation update history and the archived-content table.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::UpdateHistoryEntry;

use crate::{ms_to_datetime, to_storage_err};

pub fn record_update(
    conn: &Connection,
    memory_id: &str,
    old_version: u64,
    new_version: u64,
    at_ms: i64,
    reason: Option<&str>,
) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO update_history (memory_id, old_version, new_version, patched_at_ms, reason)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![memory_id, old_version, new_version, at_ms, reason],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn history_for(conn: &Connection, memory_id: &str) -> EngramResult<Vec<UpdateHistoryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, memory_id, old_version, new_version, patched_at_ms, reason
             FROM update_history WHERE memory_id = ?1 ORDER BY id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_id], |row| {
            Ok(UpdateHistoryEntry {
                id: row.get(0)?,
                memory_id: row.get(1)?,
                old_version: row.get(2)?,
                new_version: row.get(3)?,
                patched_at: ms_to_datetime(row.get(4)?),
                reason: row.get(5)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

/// Store the zstd-compressed original content of a fully compressed memory.
pub fn archive_content(
    conn: &Connection,
    memory_id: &str,
    compressed: &[u8],
    at_ms: i64,
) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memory_archive (memory_id, original_content, archived_at_ms)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(memory_id) DO UPDATE SET original_content = ?2, archived_at_ms = ?3",
        params![memory_id, compressed, at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn archived_content(conn: &Connection, memory_id: &str) -> EngramResult<Option<Vec<u8>>> {
    let result = conn
        .query_row(
            "SELECT original_content FROM memory_archive WHERE memory_id = ?1",
            params![memory_id],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result)
}
