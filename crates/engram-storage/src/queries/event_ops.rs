//! Episodic event persistence.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{EpisodicEvent, EventConsolidationStatus, EventContext};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_event(conn: &Connection, event: &EpisodicEvent) -> EngramResult<()> {
    let context_json =
        serde_json::to_string(&event.context).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO events (
            id, project_id, session, timestamp_ms, event_type, content, outcome,
            context, learning_delta, surprise, access_count, confidence,
            consolidation_status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            event.id,
            event.project_id,
            event.session,
            datetime_to_ms(event.timestamp),
            event.event_type,
            event.content,
            event.outcome,
            context_json,
            event.learning_delta,
            event.surprise,
            event.access_count,
            event.confidence,
            event.consolidation_status.as_str(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_event(conn: &Connection, id: &str) -> EngramResult<Option<EpisodicEvent>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_EVENT} FROM events WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let result = stmt
        .query_row(params![id], |row| Ok(row_to_event(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(event)) => Ok(Some(event)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Events pending consolidation, oldest first.
pub fn list_pending_events(conn: &Connection, project_id: &str) -> EngramResult<Vec<EpisodicEvent>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_EVENT} FROM events
             WHERE project_id = ?1 AND consolidation_status = 'pending'
             ORDER BY timestamp_ms ASC, id ASC"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect(stmt.query_map(params![project_id], |row| Ok(row_to_event(row))))
}

/// Events in a time range, newest first.
pub fn list_events_in_range(
    conn: &Connection,
    project_id: &str,
    from_ms: i64,
    to_ms: i64,
    limit: usize,
) -> EngramResult<Vec<EpisodicEvent>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_EVENT} FROM events
             WHERE project_id = ?1 AND timestamp_ms BETWEEN ?2 AND ?3
             ORDER BY timestamp_ms DESC
             LIMIT ?4"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    collect(stmt.query_map(params![project_id, from_ms, to_ms, limit], |row| {
        Ok(row_to_event(row))
    }))
}

/// Flip consolidation status for a batch of events.
pub fn mark_events(
    conn: &Connection,
    ids: &[String],
    status: EventConsolidationStatus,
) -> EngramResult<usize> {
    let mut changed = 0;
    for id in ids {
        changed += conn
            .execute(
                "UPDATE events SET consolidation_status = ?2 WHERE id = ?1",
                params![id, status.as_str()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(changed)
}

pub fn count_events(conn: &Connection, project_id: &str) -> EngramResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM events WHERE project_id = ?1",
        params![project_id],
        |row| row.get::<_, u64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

const SELECT_EVENT: &str = "SELECT id, project_id, session, timestamp_ms, event_type, \
    content, outcome, context, learning_delta, surprise, access_count, confidence, \
    consolidation_status";

fn row_to_event(row: &rusqlite::Row<'_>) -> EngramResult<EpisodicEvent> {
    let context_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let context: EventContext =
        serde_json::from_str(&context_json).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(12).map_err(|e| to_storage_err(e.to_string()))?;
    let consolidation_status = EventConsolidationStatus::parse(&status_str)
        .ok_or_else(|| to_storage_err(format!("unknown event status: {status_str}")))?;
    let ts_ms: i64 = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(EpisodicEvent {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        session: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        timestamp: ms_to_datetime(ts_ms),
        event_type: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        outcome: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        context,
        learning_delta: row.get(8).map_err(|e| to_storage_err(e.to_string()))?,
        surprise: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
        access_count: row.get(10).map_err(|e| to_storage_err(e.to_string()))?,
        confidence: row.get(11).map_err(|e| to_storage_err(e.to_string()))?,
        consolidation_status,
    })
}

fn collect(
    rows: rusqlite::Result<impl Iterator<Item = rusqlite::Result<EngramResult<EpisodicEvent>>>>,
) -> EngramResult<Vec<EpisodicEvent>> {
    let rows = rows.map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
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
    fn insert_then_get_round_trips() {
        let conn = test_conn();
        let mut event = EpisodicEvent::new("p1", "s1", "command", "ran deploy script");
        event.surprise = 0.4;
        insert_event(&conn, &event).unwrap();

        let loaded = get_event(&conn, &event.id).unwrap().unwrap();
        assert_eq!(loaded.content, "ran deploy script");
        assert!((loaded.surprise - 0.4).abs() < 1e-9);
        assert_eq!(
            loaded.consolidation_status,
            EventConsolidationStatus::Pending
        );
    }

    #[test]
    fn pending_listing_excludes_consolidated() {
        let conn = test_conn();
        let a = EpisodicEvent::new("p1", "s1", "command", "first");
        let b = EpisodicEvent::new("p1", "s1", "command", "second");
        insert_event(&conn, &a).unwrap();
        insert_event(&conn, &b).unwrap();

        mark_events(&conn, &[a.id.clone()], EventConsolidationStatus::Consolidated).unwrap();

        let pending = list_pending_events(&conn, "p1").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }
}
