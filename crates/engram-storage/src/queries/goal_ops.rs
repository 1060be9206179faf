//! Goal tree rows.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Priority, Progress};
use engram_core::models::{Goal, GoalStatus, GoalType};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_goal(conn: &Connection, goal: &Goal) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO goals (
            id, project_id, text, goal_type, parent_id, priority,
            priority_overridden, status, progress, deadline_ms, created_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            goal.id,
            goal.project_id,
            goal.text,
            goal.goal_type.as_str(),
            goal.parent_id,
            goal.priority.value(),
            goal.priority_overridden as i32,
            goal.status.as_str(),
            goal.progress.value(),
            goal.deadline.map(datetime_to_ms),
            datetime_to_ms(goal.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_goal(conn: &Connection, id: &str) -> EngramResult<Option<Goal>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_GOAL} FROM goals WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let result = stmt
        .query_row(params![id], |row| Ok(row_to_goal(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(goal)) => Ok(Some(goal)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

pub fn children_of(conn: &Connection, parent_id: &str) -> EngramResult<Vec<Goal>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_GOAL} FROM goals WHERE parent_id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![parent_id], |row| Ok(row_to_goal(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

pub fn list_goals(conn: &Connection, project_id: &str) -> EngramResult<Vec<Goal>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_GOAL} FROM goals WHERE project_id = ?1 ORDER BY created_at_ms ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| Ok(row_to_goal(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

pub fn set_status(conn: &Connection, goal_id: &str, status: GoalStatus) -> EngramResult<()> {
    let changed = conn
        .execute(
            "UPDATE goals SET status = ?2 WHERE id = ?1",
            params![goal_id, status.as_str()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "goal",
            id: goal_id.to_string(),
        });
    }
    Ok(())
}

pub fn set_progress(conn: &Connection, goal_id: &str, progress: Progress) -> EngramResult<()> {
    let changed = conn
        .execute(
            "UPDATE goals SET progress = ?2 WHERE id = ?1",
            params![goal_id, progress.value()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "goal",
            id: goal_id.to_string(),
        });
    }
    Ok(())
}

const SELECT_GOAL: &str = "SELECT id, project_id, text, goal_type, parent_id, priority, \
    priority_overridden, status, progress, deadline_ms, created_at_ms";

fn row_to_goal(row: &rusqlite::Row<'_>) -> EngramResult<Goal> {
    let type_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let overridden: i32 = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;
    let deadline: Option<i64> = row.get(9).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Goal {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        text: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        goal_type: GoalType::parse(&type_str)
            .ok_or_else(|| to_storage_err(format!("unknown goal type: {type_str}")))?,
        parent_id: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        priority: Priority::new(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
        priority_overridden: overridden != 0,
        status: GoalStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("unknown goal status: {status_str}")))?,
        progress: Progress::new(row.get(8).map_err(|e| to_storage_err(e.to_string()))?),
        deadline: deadline.map(ms_to_datetime),
        created_at: ms_to_datetime(row.get(10).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn goal_round_trip_with_children() {
        let conn = test_conn();
        let parent = Goal::new("p1", "ship the release", GoalType::Primary);
        let mut child = Goal::new("p1", "write changelog", GoalType::Subgoal);
        child.parent_id = Some(parent.id.clone());
        insert_goal(&conn, &parent).unwrap();
        insert_goal(&conn, &child).unwrap();

        let kids = children_of(&conn, &parent.id).unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].text, "write changelog");
    }

    #[test]
    fn status_and_progress_updates() {
        let conn = test_conn();
        let goal = Goal::new("p1", "maintain CI", GoalType::Maintenance);
        insert_goal(&conn, &goal).unwrap();

        set_progress(&conn, &goal.id, Progress::new(0.5)).unwrap();
        set_status(&conn, &goal.id, GoalStatus::Suspended).unwrap();

        let loaded = get_goal(&conn, &goal.id).unwrap().unwrap();
        assert_eq!(loaded.status, GoalStatus::Suspended);
        assert!((loaded.progress.value() - 0.5).abs() < 1e-9);
    }
}
