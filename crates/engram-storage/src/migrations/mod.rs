//! Ordered, idempotent migration runner.
//!
//! Each versioned module applies one schema revision inside a transaction.
//! `schema_migrations` records what has been applied; re-running is a
//! no-op. Downgrades are not supported online.

pub mod v001_core_tables;
pub mod v002_assoc_tables;
pub mod v003_executive_tables;
pub mod v004_graph_gate_tables;
pub mod v005_runs_outbox_audit;

use rusqlite::Connection;
use tracing::info;

use engram_core::errors::{EngramResult, StorageError};

use crate::to_storage_err;

type Migration = (u32, &'static str, fn(&Connection) -> EngramResult<()>);

/// All migrations, ascending by version.
const MIGRATIONS: &[Migration] = &[
    (1, "core tables", v001_core_tables::apply),
    (2, "associative network tables", v002_assoc_tables::apply),
    (3, "executive tables", v003_executive_tables::apply),
    (4, "graph and gate tables", v004_graph_gate_tables::apply),
    (5, "runs, outbox, audit", v005_runs_outbox_audit::apply),
];

/// Run all pending migrations. Safe to call on every startup.
pub fn run_migrations(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at_ms INTEGER NOT NULL
        )",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let current = highest_applied(conn)?;

    for (version, name, apply) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        conn.execute_batch("BEGIN")
            .map_err(|e| to_storage_err(e.to_string()))?;

        let result = apply(conn).and_then(|()| {
            conn.execute(
                "INSERT INTO schema_migrations (version, name, applied_at_ms) VALUES (?1, ?2, ?3)",
                rusqlite::params![version, name, chrono::Utc::now().timestamp_millis()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
            Ok(())
        });

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(e.to_string()))?;
                info!(version, name, "applied migration");
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(StorageError::MigrationFailed {
                    version: *version,
                    reason: e.to_string(),
                }
                .into());
            }
        }
    }

    Ok(())
}

/// Highest applied schema version, 0 when fresh.
pub fn highest_applied(conn: &Connection) -> EngramResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get::<_, u32>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_on_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(highest_applied(&conn).unwrap(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn versions_are_strictly_ascending() {
        let mut prev = 0;
        for (version, _, _) in MIGRATIONS {
            assert!(*version > prev);
            prev = *version;
        }
    }
}
