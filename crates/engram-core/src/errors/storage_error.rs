use super::ErrorKind;

/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("database corruption detected: {details}")]
    CorruptionDetected { details: String },

    #[error("connection pool exhausted: {active_connections} active connections")]
    PoolExhausted { active_connections: usize },

    #[error("dual-write compensation failed for {memory_id}: {reason}")]
    CompensationFailed { memory_id: String, reason: String },
}

impl StorageError {
    pub(crate) fn kind(&self) -> ErrorKind {
        ErrorKind::StoreUnavailable
    }
}
