//! Task rows: insert, status transitions with optimistic versioning, and
//! ready-polling with dependency checks.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::Priority;
use engram_core::models::{Task, TaskStatus};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_task(conn: &Connection, task: &Task) -> EngramResult<()> {
    let requirements =
        serde_json::to_string(&task.requirements).map_err(|e| to_storage_err(e.to_string()))?;
    let dependencies =
        serde_json::to_string(&task.dependencies).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO tasks (
            id, project_id, content, status, priority, requirements, dependencies,
            assignee, version, retry_count, effort_estimate_ms, effort_actual_ms,
            created_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            task.id,
            task.project_id,
            task.content,
            task.status.as_str(),
            task.priority.value(),
            requirements,
            dependencies,
            task.assignee,
            task.version,
            task.retry_count,
            task.effort_estimate_ms,
            task.effort_actual_ms,
            datetime_to_ms(task.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_task(conn: &Connection, id: &str) -> EngramResult<Option<Task>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_TASK} FROM tasks WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let result = stmt
        .query_row(params![id], |row| Ok(row_to_task(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(task)) => Ok(Some(task)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Pending tasks whose dependencies are all completed, ordered by priority
/// descending then FIFO by creation time.
pub fn poll_ready_tasks(
    conn: &Connection,
    project_id: &str,
    limit: usize,
) -> EngramResult<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_TASK} FROM tasks
             WHERE project_id = ?1 AND status = 'pending'
             ORDER BY priority DESC, created_at_ms ASC, id ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| Ok(row_to_task(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut ready = Vec::new();
    for row in rows {
        let task = row.map_err(|e| to_storage_err(e.to_string()))??;
        if dependencies_met(conn, &task)? {
            ready.push(task);
            if ready.len() >= limit {
                break;
            }
        }
    }
    Ok(ready)
}

/// Whether every dependency of the task is completed.
pub fn dependencies_met(conn: &Connection, task: &Task) -> EngramResult<bool> {
    for dep_id in &task.dependencies {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM tasks WHERE id = ?1",
                params![dep_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| to_storage_err(e.to_string()))?;
        match status.as_deref() {
            Some("completed") => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Optimistic claim: succeeds only when the stored version matches
/// `expected_version`. On success the task is assigned and the version
/// bumped; on mismatch the caller gets `VersionConflict`.
pub fn claim_task(
    conn: &Connection,
    task_id: &str,
    agent_id: &str,
    expected_version: u64,
) -> EngramResult<u64> {
    // A task never leaves pending while a dependency is open.
    if let Some(task) = get_task(conn, task_id)? {
        if !dependencies_met(conn, &task)? {
            return Err(engram_core::errors::ExecutiveError::DependenciesUnmet {
                task_id: task_id.to_string(),
            }
            .into());
        }
    }

    let changed = conn
        .execute(
            "UPDATE tasks SET status = 'assigned', assignee = ?2, version = version + 1
             WHERE id = ?1 AND version = ?3 AND status = 'pending'",
            params![task_id, agent_id, expected_version],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    if changed == 1 {
        return Ok(expected_version + 1);
    }

    let actual: Option<u64> = conn
        .query_row(
            "SELECT version FROM tasks WHERE id = ?1",
            params![task_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match actual {
        None => Err(EngramError::NotFound {
            entity: "task",
            id: task_id.to_string(),
        }),
        Some(actual) => Err(EngramError::VersionConflict {
            id: task_id.to_string(),
            expected: expected_version,
            actual,
        }),
    }
}

/// Move a task to a new status, bumping the version.
pub fn transition_task(
    conn: &Connection,
    task_id: &str,
    status: TaskStatus,
    effort_actual_ms: Option<u64>,
) -> EngramResult<()> {
    let changed = conn
        .execute(
            "UPDATE tasks SET status = ?2, version = version + 1,
                effort_actual_ms = COALESCE(?3, effort_actual_ms)
             WHERE id = ?1",
            params![task_id, status.as_str(), effort_actual_ms],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "task",
            id: task_id.to_string(),
        });
    }
    Ok(())
}

/// Requeue a task after a failure or an agent going offline: back to
/// pending, unassigned, retry_count incremented.
pub fn requeue_task(conn: &Connection, task_id: &str) -> EngramResult<u32> {
    conn.execute(
        "UPDATE tasks SET status = 'pending', assignee = NULL,
            retry_count = retry_count + 1, version = version + 1
         WHERE id = ?1",
        params![task_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    conn.query_row(
        "SELECT retry_count FROM tasks WHERE id = ?1",
        params![task_id],
        |row| row.get::<_, u32>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Tasks currently assigned to or running on an agent.
pub fn tasks_for_agent(conn: &Connection, agent_id: &str) -> EngramResult<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_TASK} FROM tasks
             WHERE assignee = ?1 AND status IN ('assigned', 'running')"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![agent_id], |row| Ok(row_to_task(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

const SELECT_TASK: &str = "SELECT id, project_id, content, status, priority, requirements, \
    dependencies, assignee, version, retry_count, effort_estimate_ms, effort_actual_ms, \
    created_at_ms";

fn row_to_task(row: &rusqlite::Row<'_>) -> EngramResult<Task> {
    let status_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let requirements_json: String = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let dependencies_json: String = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Task {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        status: TaskStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("unknown task status: {status_str}")))?,
        priority: Priority::new(row.get(4).map_err(|e| to_storage_err(e.to_string()))?),
        requirements: serde_json::from_str(&requirements_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        dependencies: serde_json::from_str(&dependencies_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        assignee: row.get(7).map_err(|e| to_storage_err(e.to_string()))?,
        version: row.get(8).map_err(|e| to_storage_err(e.to_string()))?,
        retry_count: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
        effort_estimate_ms: row.get(10).map_err(|e| to_storage_err(e.to_string()))?,
        effort_actual_ms: row.get(11).map_err(|e| to_storage_err(e.to_string()))?,
        created_at: ms_to_datetime(row.get(12).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use engram_core::errors::ErrorKind;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn dependency_gated_polling() {
        let conn = test_conn();
        let a = Task::new("p1", "task A");
        let mut b = Task::new("p1", "task B");
        b.dependencies = vec![a.id.clone()];
        insert_task(&conn, &a).unwrap();
        insert_task(&conn, &b).unwrap();

        let ready = poll_ready_tasks(&conn, "p1", 10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, a.id);

        transition_task(&conn, &a.id, TaskStatus::Completed, None).unwrap();
        let ready = poll_ready_tasks(&conn, "p1", 10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, b.id);
    }

    #[test]
    fn priority_then_fifo_ordering() {
        let conn = test_conn();
        let mut low = Task::new("p1", "low");
        low.priority = Priority::new(2);
        let mut high = Task::new("p1", "high");
        high.priority = Priority::new(9);
        insert_task(&conn, &low).unwrap();
        insert_task(&conn, &high).unwrap();

        let ready = poll_ready_tasks(&conn, "p1", 10).unwrap();
        assert_eq!(ready[0].id, high.id);
        assert_eq!(ready[1].id, low.id);
    }

    #[test]
    fn claim_is_exclusive() {
        let conn = test_conn();
        let task = Task::new("p1", "claim me");
        insert_task(&conn, &task).unwrap();

        let new_version = claim_task(&conn, &task.id, "agent-1", 1).unwrap();
        assert_eq!(new_version, 2);

        let err = claim_task(&conn, &task.id, "agent-2", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
        assert_eq!(err.conflict_version(), Some(2));
    }

    #[test]
    fn requeue_resets_to_pending_and_counts_retry() {
        let conn = test_conn();
        let task = Task::new("p1", "flaky");
        insert_task(&conn, &task).unwrap();
        claim_task(&conn, &task.id, "agent-1", 1).unwrap();

        let retries = requeue_task(&conn, &task.id).unwrap();
        assert_eq!(retries, 1);
        let loaded = get_task(&conn, &task.id).unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Pending);
        assert!(loaded.assignee.is_none());
    }

    #[test]
    fn claim_missing_task_is_not_found() {
        let conn = test_conn();
        let err = claim_task(&conn, "ghost", "agent-1", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
