use chrono::{DateTime, Utc};

use crate::errors::EngramResult;
use crate::memory::{MemoryKind, MemoryRecord};

/// The subset of relational storage the upper layers depend on. The full
/// engine exposes more; this seam is what retrieval and consolidation
/// need, and what test fakes implement.
pub trait IMemoryStore: Send + Sync {
    fn get_memory(&self, id: &str) -> EngramResult<Option<MemoryRecord>>;

    fn get_memories(&self, ids: &[String]) -> EngramResult<Vec<MemoryRecord>>;

    /// Current (non-superseded) memories for a project, optionally by kind.
    fn list_memories(
        &self,
        project_id: &str,
        kind: Option<MemoryKind>,
    ) -> EngramResult<Vec<MemoryRecord>>;

    /// BM25-ranked full-text search over content.
    fn search_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> EngramResult<Vec<(MemoryRecord, f64)>>;

    /// Records created or accessed inside a time range, recency-ordered.
    fn search_temporal(
        &self,
        project_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>>;
}
