//! Change snapshots for the safety gate.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::ChangeSnapshot;

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_snapshot(conn: &Connection, snapshot: &ChangeSnapshot) -> EngramResult<()> {
    let state = serde_json::to_string(&snapshot.state).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO change_snapshots (id, project_id, target, state, taken_at_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            snapshot.id,
            snapshot.project_id,
            snapshot.target,
            state,
            datetime_to_ms(snapshot.taken_at)
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_snapshot(conn: &Connection, id: &str) -> EngramResult<Option<ChangeSnapshot>> {
    let result = conn
        .query_row(
            "SELECT id, project_id, target, state, taken_at_ms
             FROM change_snapshots WHERE id = ?1",
            params![id],
            |row| {
                let state_json: String = row.get(3)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    state_json,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match result {
        Some((id, project_id, target, state_json, taken_ms)) => {
            let state =
                serde_json::from_str(&state_json).map_err(|e| to_storage_err(e.to_string()))?;
            Ok(Some(ChangeSnapshot {
                id,
                project_id,
                target,
                state,
                taken_at: ms_to_datetime(taken_ms),
            }))
        }
        None => Ok(None),
    }
}
