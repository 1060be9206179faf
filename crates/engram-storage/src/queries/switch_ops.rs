//! Task-switch records.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{FocusTransition, TaskSwitch};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_switch(conn: &Connection, switch: &TaskSwitch) -> EngramResult<()> {
    let pinned =
        serde_json::to_string(&switch.pinned_items).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO task_switches (
            id, project_id, from_goal, to_goal, transition, cost_ms, pinned_items,
            switched_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            switch.id,
            switch.project_id,
            switch.from_goal,
            switch.to_goal,
            switch.transition.as_str(),
            switch.cost_ms,
            pinned,
            datetime_to_ms(switch.switched_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Recent switches for a project, newest first.
pub fn recent_switches(
    conn: &Connection,
    project_id: &str,
    limit: usize,
) -> EngramResult<Vec<TaskSwitch>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, project_id, from_goal, to_goal, transition, cost_ms, pinned_items,
                    switched_at_ms
             FROM task_switches WHERE project_id = ?1
             ORDER BY switched_at_ms DESC LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id, limit], |row| {
            let transition_str: String = row.get(4)?;
            let pinned_json: String = row.get(6)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                transition_str,
                row.get::<_, u64>(5)?,
                pinned_json,
                row.get::<_, i64>(7)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (id, project_id, from_goal, to_goal, transition_str, cost_ms, pinned_json, at_ms) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let transition = parse_transition(&transition_str)
            .ok_or_else(|| to_storage_err(format!("unknown transition: {transition_str}")))?;
        out.push(TaskSwitch {
            id,
            project_id,
            from_goal,
            to_goal,
            transition,
            cost_ms,
            pinned_items: serde_json::from_str(&pinned_json)
                .map_err(|e| to_storage_err(e.to_string()))?,
            switched_at: ms_to_datetime(at_ms),
        });
    }
    Ok(out)
}

fn parse_transition(s: &str) -> Option<FocusTransition> {
    match s {
        "voluntary" => Some(FocusTransition::Voluntary),
        "automatic" => Some(FocusTransition::Automatic),
        "interruption" => Some(FocusTransition::Interruption),
        "return" => Some(FocusTransition::Return),
        _ => None,
    }
}
