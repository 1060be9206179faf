use super::ErrorKind;

/// Rule gate and approval-flow errors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("change blocked by rule {rule_id}: {reason}")]
    Blocked { rule_id: String, reason: String },

    #[error("approval request not found: {request_id}")]
    RequestNotFound { request_id: String },

    #[error("snapshot missing for request {request_id}")]
    SnapshotMissing { request_id: String },
}

impl GateError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Self::Blocked { .. } => ErrorKind::PolicyDenied,
            Self::RequestNotFound { .. } => ErrorKind::NotFound,
            Self::SnapshotMissing { .. } => ErrorKind::NotFound,
        }
    }
}
