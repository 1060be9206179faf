//! Agent registry rows.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::models::{Agent, AgentStatus};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn upsert_agent(conn: &Connection, agent: &Agent) -> EngramResult<()> {
    let capabilities =
        serde_json::to_string(&agent.capabilities).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO agents (
            id, agent_type, capabilities, status, last_heartbeat_ms, current_task,
            registered_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            agent_type = ?2, capabilities = ?3, status = ?4,
            last_heartbeat_ms = ?5, current_task = ?6",
        params![
            agent.id,
            agent.agent_type,
            capabilities,
            agent.status.as_str(),
            datetime_to_ms(agent.last_heartbeat),
            agent.current_task,
            datetime_to_ms(agent.registered_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_agent(conn: &Connection, id: &str) -> EngramResult<Option<Agent>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_AGENT} FROM agents WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let result = stmt
        .query_row(params![id], |row| Ok(row_to_agent(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(agent)) => Ok(Some(agent)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Record a heartbeat. Offline agents come back to idle.
pub fn heartbeat(conn: &Connection, id: &str, at_ms: i64) -> EngramResult<()> {
    let changed = conn
        .execute(
            "UPDATE agents SET last_heartbeat_ms = ?2,
                status = CASE WHEN status = 'offline' THEN 'idle' ELSE status END
             WHERE id = ?1",
            params![id, at_ms],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "agent",
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn set_status(
    conn: &Connection,
    id: &str,
    status: AgentStatus,
    current_task: Option<&str>,
) -> EngramResult<()> {
    conn.execute(
        "UPDATE agents SET status = ?2, current_task = ?3 WHERE id = ?1",
        params![id, status.as_str(), current_task],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Agents whose heartbeat is older than `stale_before_ms` and not yet
/// marked offline.
pub fn stale_agents(conn: &Connection, stale_before_ms: i64) -> EngramResult<Vec<Agent>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_AGENT} FROM agents
             WHERE last_heartbeat_ms < ?1 AND status != 'offline'"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![stale_before_ms], |row| Ok(row_to_agent(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

pub fn list_agents(conn: &Connection) -> EngramResult<Vec<Agent>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_AGENT} FROM agents ORDER BY registered_at_ms ASC"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok(row_to_agent(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

const SELECT_AGENT: &str = "SELECT id, agent_type, capabilities, status, last_heartbeat_ms, \
    current_task, registered_at_ms";

fn row_to_agent(row: &rusqlite::Row<'_>) -> EngramResult<Agent> {
    let capabilities_json: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Agent {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        agent_type: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        capabilities: serde_json::from_str(&capabilities_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        status: AgentStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("unknown agent status: {status_str}")))?,
        last_heartbeat: ms_to_datetime(row.get(4).map_err(|e| to_storage_err(e.to_string()))?),
        current_task: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        registered_at: ms_to_datetime(row.get(6).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use chrono::Utc;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn heartbeat_revives_offline_agent() {
        let conn = test_conn();
        let mut agent = Agent::new("a1", "worker", vec!["rust".into()]);
        agent.status = AgentStatus::Offline;
        upsert_agent(&conn, &agent).unwrap();

        heartbeat(&conn, "a1", Utc::now().timestamp_millis()).unwrap();
        let loaded = get_agent(&conn, "a1").unwrap().unwrap();
        assert_eq!(loaded.status, AgentStatus::Idle);
    }

    #[test]
    fn stale_scan_finds_quiet_agents() {
        let conn = test_conn();
        let agent = Agent::new("a1", "worker", vec![]);
        upsert_agent(&conn, &agent).unwrap();

        let future_ms = Utc::now().timestamp_millis() + 120_000;
        let stale = stale_agents(&conn, future_ms).unwrap();
        assert_eq!(stale.len(), 1);

        set_status(&conn, "a1", AgentStatus::Offline, None).unwrap();
        assert!(stale_agents(&conn, future_ms).unwrap().is_empty());
    }
}
