use crate::errors::EngramResult;

/// Stateless facade producing fixed-dimension vectors from text.
///
/// Implementations must be thread-safe; callers treat every call as a
/// suspension point.
pub trait IEmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> EngramResult<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> EngramResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Output dimensionality. Must match the index dimension.
    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;

    fn is_available(&self) -> bool;
}
