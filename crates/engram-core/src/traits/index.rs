use crate::errors::EngramResult;

/// Approximate-nearest-neighbor index over cosine space, one collection
/// per project, entries keyed by memory id.
pub trait IVectorIndex: Send + Sync {
    /// Insert or replace the vector for `memory_id`.
    fn upsert(&self, project_id: &str, memory_id: &str, vector: &[f32]) -> EngramResult<()>;

    /// Remove the vector for `memory_id`. Missing entries are not an error.
    fn delete(&self, project_id: &str, memory_id: &str) -> EngramResult<()>;

    /// Top-k ids by cosine similarity, descending.
    fn search(
        &self,
        project_id: &str,
        query: &[f32],
        k: usize,
    ) -> EngramResult<Vec<(String, f64)>>;

    /// All ids currently indexed for a project, for reconciliation.
    fn ids(&self, project_id: &str) -> EngramResult<Vec<String>>;

    /// Whether an entry exists.
    fn contains(&self, project_id: &str, memory_id: &str) -> EngramResult<bool>;
}
