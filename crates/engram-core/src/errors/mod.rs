//! Error taxonomy.
//!
//! Each subsystem has its own thiserror enum; `EngramError` is the umbrella
//! every public operation returns. Callers see a stable ten-kind taxonomy
//! via [`EngramError::kind`] plus a stable code string, an optional retry
//! hint, and an optional conflicting version for reconciliation.

mod attention_error;
mod consolidation_error;
mod executive_error;
mod gate_error;
mod index_error;
mod retrieval_error;
mod storage_error;

pub use attention_error::AttentionError;
pub use consolidation_error::ConsolidationError;
pub use executive_error::ExecutiveError;
pub use gate_error::GateError;
pub use index_error::IndexError;
pub use retrieval_error::RetrievalError;
pub use storage_error::StorageError;

/// Result alias used across the workspace.
pub type EngramResult<T> = Result<T, EngramError>;

/// The caller-visible error taxonomy. Every `EngramError` maps to exactly
/// one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    VersionConflict,
    QuotaExceeded,
    IndexUnavailable,
    StoreUnavailable,
    Overloaded,
    CircuitOpen,
    PolicyDenied,
    InvalidArgument,
    Timeout,
}

impl ErrorKind {
    /// Stable code string for transports and logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "engram/not_found",
            Self::VersionConflict => "engram/version_conflict",
            Self::QuotaExceeded => "engram/quota_exceeded",
            Self::IndexUnavailable => "engram/index_unavailable",
            Self::StoreUnavailable => "engram/store_unavailable",
            Self::Overloaded => "engram/overloaded",
            Self::CircuitOpen => "engram/circuit_open",
            Self::PolicyDenied => "engram/policy_denied",
            Self::InvalidArgument => "engram/invalid_argument",
            Self::Timeout => "engram/timeout",
        }
    }
}

/// Umbrella error returned by every public operation.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("quota exceeded for project {project_id}: {resource} usage {used}/{limit}")]
    QuotaExceeded {
        project_id: String,
        resource: &'static str,
        used: u64,
        limit: u64,
    },

    #[error("vector index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    #[error("relational store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("overloaded: {reason}")]
    Overloaded { reason: String, retry_after_ms: u64 },

    #[error("circuit open for strategy {strategy}")]
    CircuitOpen {
        strategy: String,
        retry_after_ms: u64,
    },

    #[error("denied by policy: {reason}")]
    PolicyDenied { reason: String },

    #[error("invalid argument {argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("deadline exceeded during {operation}")]
    Timeout { operation: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),

    #[error(transparent)]
    Attention(#[from] AttentionError),

    #[error(transparent)]
    Executive(#[from] ExecutiveError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

impl EngramError {
    /// Map to the caller-visible taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::IndexUnavailable { .. } => ErrorKind::IndexUnavailable,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::Overloaded { .. } => ErrorKind::Overloaded,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::PolicyDenied { .. } => ErrorKind::PolicyDenied,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Storage(e) => e.kind(),
            Self::Index(_) => ErrorKind::IndexUnavailable,
            Self::Retrieval(e) => e.kind(),
            Self::Consolidation(_) => ErrorKind::StoreUnavailable,
            Self::Attention(_) => ErrorKind::InvalidArgument,
            Self::Executive(e) => e.kind(),
            Self::Gate(e) => e.kind(),
        }
    }

    /// Stable code string.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Retry hint in milliseconds, where one applies.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Overloaded { retry_after_ms, .. }
            | Self::CircuitOpen { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// The version found in storage when a conflict occurred.
    pub fn conflict_version(&self) -> Option<u64> {
        match self {
            Self::VersionConflict { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Convenience constructor for a missing memory.
    pub fn memory_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "memory",
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_codes() {
        let err = EngramError::memory_not_found("m1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "engram/not_found");
    }

    #[test]
    fn version_conflict_exposes_actual_version() {
        let err = EngramError::VersionConflict {
            id: "m1".into(),
            expected: 1,
            actual: 3,
        };
        assert_eq!(err.conflict_version(), Some(3));
        assert_eq!(err.retry_after_ms(), None);
    }

    #[test]
    fn circuit_open_carries_retry_hint() {
        let err = EngramError::CircuitOpen {
            strategy: "vector".into(),
            retry_after_ms: 60_000,
        };
        assert_eq!(err.retry_after_ms(), Some(60_000));
        assert_eq!(err.kind(), ErrorKind::CircuitOpen);
    }

    #[test]
    fn subsystem_errors_map_through() {
        let err: EngramError = StorageError::PoolExhausted {
            active_connections: 10,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
