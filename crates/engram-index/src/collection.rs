//! Per-project vector collections behind an availability gate.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::debug;

use engram_core::constants::EMBEDDING_DIM;
use engram_core::errors::{EngramResult, IndexError};
use engram_core::traits::IVectorIndex;

use crate::cosine::cosine_similarity;

/// The in-process vector index. One `DashMap` collection per project;
/// entries keyed by memory id.
pub struct VectorIndex {
    collections: DashMap<String, DashMap<String, Vec<f32>>>,
    available: AtomicBool,
    dimensions: usize,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::with_dimensions(EMBEDDING_DIM)
    }

    /// Non-standard dimensionality, for tests that use short vectors.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            collections: DashMap::new(),
            available: AtomicBool::new(true),
            dimensions,
        }
    }

    /// Flip availability. Used by operators and failure-injection tests;
    /// while down, every call reports `IndexUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        debug!(available, "vector index availability changed");
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Total entries across all collections.
    pub fn len(&self) -> usize {
        self.collections.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> EngramResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(IndexError::Offline {
                reason: "index marked unavailable".into(),
            }
            .into())
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> EngramResult<()> {
        if vector.len() == self.dimensions {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            }
            .into())
        }
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IVectorIndex for VectorIndex {
    fn upsert(&self, project_id: &str, memory_id: &str, vector: &[f32]) -> EngramResult<()> {
        self.check_available()?;
        self.check_dimensions(vector)?;
        self.collections
            .entry(project_id.to_string())
            .or_default()
            .insert(memory_id.to_string(), vector.to_vec());
        Ok(())
    }

    fn delete(&self, project_id: &str, memory_id: &str) -> EngramResult<()> {
        self.check_available()?;
        if let Some(collection) = self.collections.get(project_id) {
            collection.remove(memory_id);
        }
        Ok(())
    }

    fn search(
        &self,
        project_id: &str,
        query: &[f32],
        k: usize,
    ) -> EngramResult<Vec<(String, f64)>> {
        self.check_available()?;
        self.check_dimensions(query)?;

        let Some(collection) = self.collections.get(project_id) else {
            return Ok(vec![]);
        };

        let mut scored: Vec<(String, f64)> = collection
            .iter()
            .map(|entry| (entry.key().clone(), cosine_similarity(query, entry.value())))
            .collect();

        // Sort by similarity descending, id ascending for determinism.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn ids(&self, project_id: &str) -> EngramResult<Vec<String>> {
        self.check_available()?;
        Ok(self
            .collections
            .get(project_id)
            .map(|c| c.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default())
    }

    fn contains(&self, project_id: &str, memory_id: &str) -> EngramResult<bool> {
        self.check_available()?;
        Ok(self
            .collections
            .get(project_id)
            .is_some_and(|c| c.contains_key(memory_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::errors::ErrorKind;

    fn index() -> VectorIndex {
        VectorIndex::with_dimensions(4)
    }

    #[test]
    fn upsert_then_search_returns_the_entry() {
        let idx = index();
        idx.upsert("p1", "m1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.upsert("p1", "m2", &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let hits = idx.search("p1", &[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, "m1");
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn delete_removes_the_entry() {
        let idx = index();
        idx.upsert("p1", "m1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.delete("p1", "m1").unwrap();
        assert!(!idx.contains("p1", "m1").unwrap());
        // Deleting again is not an error.
        idx.delete("p1", "m1").unwrap();
    }

    #[test]
    fn collections_are_isolated_per_project() {
        let idx = index();
        idx.upsert("p1", "m1", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(idx.search("p2", &[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn unavailable_index_rejects_everything() {
        let idx = index();
        idx.set_available(false);
        let err = idx.upsert("p1", "m1", &[1.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);
        let err = idx.search("p1", &[1.0, 0.0, 0.0, 0.0], 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let idx = index();
        let err = idx.upsert("p1", "m1", &[1.0, 0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexUnavailable);
    }

    #[test]
    fn search_ties_break_by_id() {
        let idx = index();
        idx.upsert("p1", "b", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        idx.upsert("p1", "a", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let hits = idx.search("p1", &[1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, "a");
        assert_eq!(hits[1].0, "b");
    }
}
