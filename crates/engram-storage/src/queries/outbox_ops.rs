//! Outbox rows for dual-write compensation.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{OutboxEntry, OutboxOp};

use crate::{ms_to_datetime, to_storage_err};

pub fn enqueue(
    conn: &Connection,
    op: OutboxOp,
    memory_id: &str,
    project_id: &str,
    at_ms: i64,
) -> EngramResult<i64> {
    conn.execute(
        "INSERT INTO outbox (op, memory_id, project_id, created_at_ms, attempts)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![op.as_str(), memory_id, project_id, at_ms],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(conn.last_insert_rowid())
}

/// All outstanding entries, oldest first.
pub fn pending(conn: &Connection) -> EngramResult<Vec<OutboxEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, op, memory_id, project_id, created_at_ms, attempts
             FROM outbox ORDER BY id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let op_str: String = row.get(1)?;
            Ok((
                row.get::<_, i64>(0)?,
                op_str,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (id, op_str, memory_id, project_id, created_ms, attempts) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        let op = OutboxOp::parse(&op_str)
            .ok_or_else(|| to_storage_err(format!("unknown outbox op: {op_str}")))?;
        out.push(OutboxEntry {
            id,
            op,
            memory_id,
            project_id,
            created_at: ms_to_datetime(created_ms),
            attempts,
        });
    }
    Ok(out)
}

pub fn mark_attempt(conn: &Connection, id: i64) -> EngramResult<()> {
    conn.execute(
        "UPDATE outbox SET attempts = attempts + 1 WHERE id = ?1",
        params![id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn remove(conn: &Connection, id: i64) -> EngramResult<()> {
    conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    #[test]
    fn enqueue_drain_cycle() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();

        let id = enqueue(&conn, OutboxOp::IndexDelete, "m1", "p1", 1000).unwrap();
        mark_attempt(&conn, id).unwrap();

        let entries = pending(&conn).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].attempts, 1);
        assert_eq!(entries[0].op, OutboxOp::IndexDelete);

        remove(&conn, id).unwrap();
        assert!(pending(&conn).unwrap().is_empty());
    }
}
