/// Consolidation pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidationError {
    #[error("consolidation already in progress for project {project_id}")]
    AlreadyRunning { project_id: String },

    #[error("phase {phase} failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },
}
