//! Project rows and counters.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::models::Project;

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_project(conn: &Connection, project: &Project) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO projects (
            id, name, path, created_at_ms, deleted, memory_count, event_count,
            procedure_count, entity_count, quota_flagged
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            project.id,
            project.name,
            project.path,
            datetime_to_ms(project.created_at),
            project.deleted as i32,
            project.memory_count,
            project.event_count,
            project.procedure_count,
            project.entity_count,
            project.quota_flagged as i32,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_project(conn: &Connection, id: &str) -> EngramResult<Option<Project>> {
    query_project(conn, "id", id)
}

pub fn get_project_by_name(conn: &Connection, name: &str) -> EngramResult<Option<Project>> {
    query_project(conn, "name", name)
}

fn query_project(conn: &Connection, column: &str, value: &str) -> EngramResult<Option<Project>> {
    let sql = format!(
        "SELECT id, name, path, created_at_ms, deleted, memory_count, event_count,
                procedure_count, entity_count, quota_flagged
         FROM projects WHERE {column} = ?1 AND deleted = 0"
    );
    let result = conn
        .query_row(&sql, params![value], |row| {
            let deleted: i32 = row.get(4)?;
            let flagged: i32 = row.get(9)?;
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                path: row.get(2)?,
                created_at: ms_to_datetime(row.get(3)?),
                deleted: deleted != 0,
                memory_count: row.get(5)?,
                event_count: row.get(6)?,
                procedure_count: row.get(7)?,
                entity_count: row.get(8)?,
                quota_flagged: flagged != 0,
            })
        })
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(result)
}

/// Adjust a counter column by delta. Column names are fixed at call sites.
pub fn bump_counter(
    conn: &Connection,
    project_id: &str,
    counter: Counter,
    delta: i64,
) -> EngramResult<()> {
    let column = counter.column();
    let sql = format!("UPDATE projects SET {column} = MAX(0, {column} + ?2) WHERE id = ?1");
    let changed = conn
        .execute(&sql, params![project_id, delta])
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "project",
            id: project_id.to_string(),
        });
    }
    Ok(())
}

pub fn flag_quota(conn: &Connection, project_id: &str) -> EngramResult<()> {
    conn.execute(
        "UPDATE projects SET quota_flagged = 1 WHERE id = ?1",
        params![project_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Soft delete; the reconciliation sweeper handles the cascade.
pub fn soft_delete(conn: &Connection, project_id: &str) -> EngramResult<()> {
    conn.execute(
        "UPDATE projects SET deleted = 1 WHERE id = ?1",
        params![project_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// The per-project counters.
#[derive(Debug, Clone, Copy)]
pub enum Counter {
    Memories,
    Events,
    Procedures,
    Entities,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Self::Memories => "memory_count",
            Self::Events => "event_count",
            Self::Procedures => "procedure_count",
            Self::Entities => "entity_count",
        }
    }
}
