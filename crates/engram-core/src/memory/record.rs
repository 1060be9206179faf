//! The memory envelope — every durable memory in the system is one of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kinds::{MemoryKind, TypedContent};
use super::scalars::{Confidence, Usefulness};
use super::state::ConsolidationState;

/// A durable memory record: content, embedding key, and quality metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// UUID v4 identifier. Shared with the vector-index entry.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// The kind of this memory.
    pub kind: MemoryKind,
    /// Typed content — per-kind struct, not a loose JSON blob.
    pub content: TypedContent,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last time this memory was retrieved.
    pub last_accessed: DateTime<Utc>,
    /// Number of retrievals.
    pub access_count: u64,
    /// Consolidation-assigned usefulness score.
    pub usefulness: Usefulness,
    /// Confidence in the content's accuracy.
    pub confidence: Confidence,
    /// Consolidation lifecycle state.
    pub consolidation_state: ConsolidationState,
    /// Monotonically increasing version; bumped on reconsolidation.
    pub version: u64,
    /// Id of the memory that replaced this one, if superseded.
    pub superseded_by: Option<String>,
    /// 0 = uncompressed, 1/2/3 = executive summary tiers by age.
    pub compression_level: u8,
    /// Executive summary produced by the compression phase.
    pub content_executive: Option<String>,
    /// Stance in [-1, 1]; sign flips indicate contradiction candidates.
    pub stance: f64,
    /// blake3 hash of content for dedup and embedding cache keys.
    pub content_hash: String,
}

impl MemoryRecord {
    /// Build a fresh, unconsolidated record.
    pub fn new(project_id: impl Into<String>, content: TypedContent, tags: Vec<String>) -> Self {
        let now = Utc::now();
        let content_hash = Self::compute_content_hash(&content);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            kind: content.kind(),
            content,
            tags,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            usefulness: Usefulness::default(),
            confidence: Confidence::default(),
            consolidation_state: ConsolidationState::Unconsolidated,
            version: 1,
            superseded_by: None,
            compression_level: 0,
            content_executive: None,
            stance: 0.0,
            content_hash,
        }
    }

    /// Compute the blake3 content hash from the serialized content.
    pub fn compute_content_hash(content: &TypedContent) -> String {
        let serialized = serde_json::to_string(content).unwrap_or_default();
        blake3::hash(serialized.as_bytes()).to_hex().to_string()
    }

    /// The text presented to embedding and keyword search. Compressed
    /// records expose their executive summary.
    pub fn searchable_text(&self) -> &str {
        match (&self.content_executive, self.compression_level) {
            (Some(summary), level) if level >= 3 => summary,
            _ => self.content.text(),
        }
    }

    /// Whether queries should see this record by default.
    pub fn is_current(&self) -> bool {
        self.superseded_by.is_none()
    }
}

impl PartialEq for MemoryRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::kinds::SemanticContent;

    fn semantic(fact: &str) -> TypedContent {
        TypedContent::Semantic(SemanticContent {
            fact: fact.into(),
            source_events: vec![],
        })
    }

    #[test]
    fn new_record_starts_unconsolidated_at_version_one() {
        let m = MemoryRecord::new("p1", semantic("water is wet"), vec![]);
        assert_eq!(m.version, 1);
        assert_eq!(m.consolidation_state, ConsolidationState::Unconsolidated);
        assert!(m.is_current());
        assert_eq!(m.kind, MemoryKind::Semantic);
    }

    #[test]
    fn content_hash_is_stable_for_identical_content() {
        let a = MemoryRecord::new("p1", semantic("same"), vec![]);
        let b = MemoryRecord::new("p1", semantic("same"), vec![]);
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn fully_compressed_record_searches_executive_summary() {
        let mut m = MemoryRecord::new("p1", semantic("a very long original text"), vec![]);
        m.content_executive = Some("summary".into());
        m.compression_level = 3;
        assert_eq!(m.searchable_text(), "summary");

        m.compression_level = 1;
        assert_eq!(m.searchable_text(), "a very long original text");
    }
}
