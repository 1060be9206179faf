/// Vector-index errors.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index offline: {reason}")]
    Offline { reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("collection missing for project {project_id}")]
    CollectionMissing { project_id: String },
}
