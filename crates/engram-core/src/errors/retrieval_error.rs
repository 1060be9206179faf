use super::ErrorKind;

/// Retrieval subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("no strategy available: all breakers open")]
    AllStrategiesFailed,

    #[error("search failed via {strategy}: {reason}")]
    SearchFailed { strategy: String, reason: String },

    #[error("fusion failed: {reason}")]
    FusionFailed { reason: String },

    #[error("reconsolidation window closed for {memory_id}")]
    WindowClosed { memory_id: String },
}

impl RetrievalError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            Self::AllStrategiesFailed => ErrorKind::StoreUnavailable,
            Self::WindowClosed { .. } => ErrorKind::VersionConflict,
            _ => ErrorKind::StoreUnavailable,
        }
    }
}
