//! # engram-storage
//!
//! SQLite persistence: connection pool, ordered migrations, per-entity
//! query modules, the dual-write coordinator that keeps the relational
//! store and the vector index consistent, the outbox, the reconciliation
//! sweeper, advisory locks, and the audit log.
//!
//! Every persisted timestamp is an INTEGER of unix milliseconds.

pub mod advisory;
pub mod audit;
pub mod dual_write;
pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod reconcile;

pub use advisory::AdvisoryLocks;
pub use dual_write::DualWriteCoordinator;
pub use engine::StorageEngine;
pub use reconcile::Reconciler;

use chrono::{DateTime, TimeZone, Utc};

use engram_core::errors::{EngramError, StorageError};

/// Wrap a low-level SQLite failure message.
pub(crate) fn to_storage_err(message: impl Into<String>) -> EngramError {
    StorageError::Sqlite {
        message: message.into(),
    }
    .into()
}

/// Unix milliseconds → `DateTime<Utc>`. Out-of-range values clamp to epoch.
pub fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
}

/// `DateTime<Utc>` → unix milliseconds.
pub fn datetime_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_round_trip() {
        let now = Utc::now();
        let back = ms_to_datetime(datetime_to_ms(now));
        assert_eq!(back.timestamp_millis(), now.timestamp_millis());
    }
}
