/// Attention and working-memory errors.
#[derive(Debug, thiserror::Error)]
pub enum AttentionError {
    #[error("unknown focus transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("working item not found: {item_id}")]
    ItemNotFound { item_id: String },
}
