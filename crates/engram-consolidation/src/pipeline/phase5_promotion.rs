//! Phase 5: Promotion.
//!
//! Selected patterns become semantic memories (facts/insights) or
//! procedures when the template carries invocation structure. Source
//! event ids ride along. Promotion deduplicates by content hash, which
//! is what makes re-running over a frozen event set idempotent.

use engram_core::memory::{
    Confidence, MemoryRecord, ProceduralContent, SemanticContent, TypedContent, Usefulness,
};
use engram_core::models::{Pattern, PatternType};

/// Patterns below this confidence are not promoted.
const PROMOTION_CONFIDENCE_FLOOR: f64 = 0.5;

/// A promotion decision, before persistence.
#[derive(Debug, Clone)]
pub struct Promotion {
    pub record: MemoryRecord,
    pub pattern_id: String,
}

/// Build promotion records for qualifying patterns.
///
/// `exists` answers whether a current memory with the given content hash
/// already exists; duplicates are skipped.
pub fn promote_patterns<F>(
    project_id: &str,
    patterns: &[Pattern],
    mut exists: F,
) -> Vec<Promotion>
where
    F: FnMut(&str) -> bool,
{
    let mut promotions = Vec::new();

    for pattern in patterns {
        if pattern.confidence.value() < PROMOTION_CONFIDENCE_FLOOR {
            continue;
        }

        let content = content_for(pattern);
        let hash = MemoryRecord::compute_content_hash(&content);
        if exists(&hash) {
            continue;
        }

        let mut record = MemoryRecord::new(project_id, content, vec!["consolidated".into()]);
        record.confidence = Confidence::new(pattern.confidence.value());
        record.usefulness = Usefulness::new(pattern.confidence.value());
        promotions.push(Promotion {
            record,
            pattern_id: pattern.id.clone(),
        });
    }
    promotions
}

/// Workflow and error-handling templates with step structure become
/// procedures; everything else becomes a semantic fact.
fn content_for(pattern: &Pattern) -> TypedContent {
    match pattern.pattern_type {
        PatternType::Workflow | PatternType::ErrorHandling => {
            TypedContent::Procedural(ProceduralContent {
                description: pattern.content.clone(),
                steps: pattern
                    .source_events
                    .iter()
                    .map(|id| format!("see event {id}"))
                    .collect(),
                invocation: Some(format!("pattern:{}", pattern.pattern_type.as_str())),
            })
        }
        PatternType::Causal | PatternType::Preference => TypedContent::Semantic(SemanticContent {
            fact: pattern.content.clone(),
            source_events: pattern.source_events.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::memory::MemoryKind;

    fn pattern(pattern_type: PatternType, confidence: f64) -> Pattern {
        Pattern {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: "run1".into(),
            project_id: "p1".into(),
            pattern_type,
            content: "Recurring workflow around deploy".into(),
            confidence: Confidence::new(confidence),
            occurrences: 5,
            source_events: vec!["e1".into(), "e2".into()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn workflow_patterns_become_procedures() {
        let promotions = promote_patterns("p1", &[pattern(PatternType::Workflow, 0.9)], |_| false);
        assert_eq!(promotions.len(), 1);
        assert_eq!(promotions[0].record.kind, MemoryKind::Procedural);
        match &promotions[0].record.content {
            TypedContent::Procedural(p) => assert!(p.invocation.is_some()),
            other => panic!("expected procedural content, got {other:?}"),
        }
    }

    #[test]
    fn causal_patterns_become_semantic_facts_with_sources() {
        let promotions = promote_patterns("p1", &[pattern(PatternType::Causal, 0.9)], |_| false);
        match &promotions[0].record.content {
            TypedContent::Semantic(s) => assert_eq!(s.source_events.len(), 2),
            other => panic!("expected semantic content, got {other:?}"),
        }
    }

    #[test]
    fn low_confidence_patterns_are_skipped() {
        let promotions = promote_patterns("p1", &[pattern(PatternType::Workflow, 0.3)], |_| false);
        assert!(promotions.is_empty());
    }

    #[test]
    fn existing_content_hash_blocks_duplicate_promotion() {
        let p = pattern(PatternType::Causal, 0.9);
        let first = promote_patterns("p1", std::slice::from_ref(&p), |_| false);
        assert_eq!(first.len(), 1);

        let hash = first[0].record.content_hash.clone();
        let second = promote_patterns("p1", &[p], |h| h == hash);
        assert!(second.is_empty());
    }
}
