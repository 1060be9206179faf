//! Working-memory item persistence. Buffer policy lives in
//! `engram-working`; these are the raw row operations.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::memory::Activation;
use engram_core::models::{Component, WorkingItem};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_item(conn: &Connection, item: &WorkingItem) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO working_items (
            id, project_id, content, component, activation, importance,
            decay_rate, created_at_ms, last_accessed_ms, pinned
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            item.id,
            item.project_id,
            item.content,
            item.component.as_str(),
            item.activation.value(),
            item.importance,
            item.decay_rate,
            datetime_to_ms(item.created_at),
            datetime_to_ms(item.last_accessed),
            item.pinned as i32,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_item(conn: &Connection, id: &str) -> EngramResult<Option<WorkingItem>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_ITEM} FROM working_items WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let result = stmt
        .query_row(params![id], |row| Ok(row_to_item(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(item)) => Ok(Some(item)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// All items in a project's buffer.
pub fn list_items(conn: &Connection, project_id: &str) -> EngramResult<Vec<WorkingItem>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_ITEM} FROM working_items WHERE project_id = ?1 ORDER BY created_at_ms ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| Ok(row_to_item(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

/// Persist refreshed activation/access state after a read or decay pass.
pub fn update_activation(
    conn: &Connection,
    id: &str,
    activation: f64,
    last_accessed_ms: i64,
) -> EngramResult<()> {
    conn.execute(
        "UPDATE working_items SET activation = ?2, last_accessed_ms = ?3 WHERE id = ?1",
        params![id, activation, last_accessed_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn set_pinned(conn: &Connection, id: &str, pinned: bool) -> EngramResult<()> {
    conn.execute(
        "UPDATE working_items SET pinned = ?2 WHERE id = ?1",
        params![id, pinned as i32],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn delete_item(conn: &Connection, id: &str) -> EngramResult<bool> {
    let changed = conn
        .execute("DELETE FROM working_items WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(changed > 0)
}

const SELECT_ITEM: &str = "SELECT id, project_id, content, component, activation, \
    importance, decay_rate, created_at_ms, last_accessed_ms, pinned";

fn row_to_item(row: &rusqlite::Row<'_>) -> EngramResult<WorkingItem> {
    let component_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let component = Component::parse(&component_str)
        .ok_or_else(|| to_storage_err(format!("unknown component: {component_str}")))?;
    let created: i64 = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let accessed: i64 = row.get(8).map_err(|e| to_storage_err(e.to_string()))?;
    let pinned: i32 = row.get(9).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(WorkingItem {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        component,
        activation: Activation::new(row.get(4).map_err(|e| to_storage_err(e.to_string()))?),
        importance: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        decay_rate: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        created_at: ms_to_datetime(created),
        last_accessed: ms_to_datetime(accessed),
        pinned: pinned != 0,
    })
}
