//! v003: goals, tasks, task switches, agents.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn apply(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE goals (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            text TEXT NOT NULL,
            goal_type TEXT NOT NULL,
            parent_id TEXT,
            priority INTEGER NOT NULL DEFAULT 5,
            priority_overridden INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            progress REAL NOT NULL DEFAULT 0,
            deadline_ms INTEGER,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_goals_project ON goals(project_id);
        CREATE INDEX idx_goals_parent ON goals(parent_id);

        CREATE TABLE tasks (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            priority INTEGER NOT NULL DEFAULT 5,
            requirements TEXT NOT NULL,
            dependencies TEXT NOT NULL,
            assignee TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            retry_count INTEGER NOT NULL DEFAULT 0,
            effort_estimate_ms INTEGER,
            effort_actual_ms INTEGER,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_tasks_project_status ON tasks(project_id, status);
        CREATE INDEX idx_tasks_assignee ON tasks(assignee);

        CREATE TABLE task_switches (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            from_goal TEXT,
            to_goal TEXT NOT NULL,
            transition TEXT NOT NULL,
            cost_ms INTEGER NOT NULL,
            pinned_items TEXT NOT NULL,
            switched_at_ms INTEGER NOT NULL
        );
        CREATE INDEX idx_switches_project ON task_switches(project_id, switched_at_ms);

        CREATE TABLE agents (
            id TEXT PRIMARY KEY,
            agent_type TEXT NOT NULL,
            capabilities TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'idle',
            last_heartbeat_ms INTEGER NOT NULL,
            current_task TEXT,
            registered_at_ms INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
