//! Audit logger. Rows are written inside the caller's transaction so the
//! audit trail never drifts from the data it describes.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{AuditActor, AuditEntry, AuditOperation};

use crate::{ms_to_datetime, to_storage_err};

pub struct AuditLogger;

impl AuditLogger {
    pub fn log(
        conn: &Connection,
        entity_kind: &str,
        entity_id: &str,
        operation: AuditOperation,
        actor: AuditActor,
        detail: serde_json::Value,
    ) -> EngramResult<()> {
        conn.execute(
            "INSERT INTO audit_log (entity_kind, entity_id, operation, actor, detail, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entity_kind,
                entity_id,
                operation.as_str(),
                actor.label(),
                detail.to_string(),
                chrono::Utc::now().timestamp_millis(),
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(())
    }

    pub fn log_create(conn: &Connection, memory_id: &str, actor: AuditActor) -> EngramResult<()> {
        Self::log(
            conn,
            "memory",
            memory_id,
            AuditOperation::Create,
            actor,
            serde_json::json!({}),
        )
    }

    pub fn log_forget(conn: &Connection, memory_id: &str, actor: AuditActor) -> EngramResult<()> {
        Self::log(
            conn,
            "memory",
            memory_id,
            AuditOperation::Forget,
            actor,
            serde_json::json!({}),
        )
    }

    /// Recent entries for one entity, newest first.
    pub fn entries_for(
        conn: &Connection,
        entity_kind: &str,
        entity_id: &str,
        limit: usize,
    ) -> EngramResult<Vec<AuditEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, entity_kind, entity_id, operation, actor, detail, created_at_ms
                 FROM audit_log
                 WHERE entity_kind = ?1 AND entity_id = ?2
                 ORDER BY id DESC LIMIT ?3",
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![entity_kind, entity_id, limit], |row| {
                let op_str: String = row.get(3)?;
                let detail_str: String = row.get(5)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    op_str,
                    row.get::<_, String>(4)?,
                    detail_str,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(|e| to_storage_err(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, entity_kind, entity_id, op_str, actor, detail_str, created_ms) =
                row.map_err(|e| to_storage_err(e.to_string()))?;
            let operation = parse_operation(&op_str)
                .ok_or_else(|| to_storage_err(format!("unknown audit operation: {op_str}")))?;
            out.push(AuditEntry {
                id,
                entity_kind,
                entity_id,
                operation,
                actor,
                detail: serde_json::from_str(&detail_str)
                    .map_err(|e| to_storage_err(e.to_string()))?,
                created_at: ms_to_datetime(created_ms),
            });
        }
        Ok(out)
    }
}

fn parse_operation(s: &str) -> Option<AuditOperation> {
    match s {
        "create" => Some(AuditOperation::Create),
        "update" => Some(AuditOperation::Update),
        "forget" => Some(AuditOperation::Forget),
        "reconsolidate" => Some(AuditOperation::Reconsolidate),
        "approve" => Some(AuditOperation::Approve),
        "reject" => Some(AuditOperation::Reject),
        "rollback" => Some(AuditOperation::Rollback),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;

    #[test]
    fn audit_entries_accumulate_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations(&conn).unwrap();

        AuditLogger::log_create(&conn, "m1", AuditActor::System).unwrap();
        AuditLogger::log_forget(&conn, "m1", AuditActor::Agent("a1".into())).unwrap();

        let entries = AuditLogger::entries_for(&conn, "memory", "m1", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, AuditOperation::Forget);
        assert_eq!(entries[0].actor, "agent:a1");
    }
}
