//! Phase 4: Conflict resolution.
//!
//! Candidate pairs: embedding similarity at or above the conflict
//! threshold with opposed stance. The higher composite score
//! (usefulness · confidence · recency) wins; the loser is marked
//! superseded by the winner. Near-equal composites are flagged ambiguous
//! instead of resolved.

use chrono::{DateTime, Utc};

use engram_core::constants::CONFLICT_SIMILARITY_THRESHOLD;
use engram_core::memory::MemoryRecord;
use engram_index::cosine_similarity;

/// Composite-score margin below which a pair is ambiguous.
const AMBIGUITY_MARGIN: f64 = 0.05;

/// Recency half-life for the composite score, in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 30.0;

/// How one conflict pair was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Winner kept; loser superseded by winner.
    Supersede { winner: String, loser: String },
    /// Scores too close to call.
    FlagAmbiguous { a: String, b: String },
}

/// Find and resolve contradiction pairs among semantic memories.
///
/// `embeddings` is parallel to `memories`. Pairs are scanned in id order
/// so repeated runs resolve identically.
pub fn resolve_conflicts(
    memories: &[MemoryRecord],
    embeddings: &[Vec<f32>],
    now: DateTime<Utc>,
) -> Vec<Resolution> {
    let mut order: Vec<usize> = (0..memories.len()).collect();
    order.sort_by(|&a, &b| memories[a].id.cmp(&memories[b].id));

    let mut resolutions = Vec::new();
    let mut consumed: Vec<bool> = vec![false; memories.len()];

    for (oi, &i) in order.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        for &j in order.iter().skip(oi + 1) {
            if consumed[i] || consumed[j] {
                continue;
            }
            let a = &memories[i];
            let b = &memories[j];

            let similarity = cosine_similarity(&embeddings[i], &embeddings[j]);
            if similarity < CONFLICT_SIMILARITY_THRESHOLD {
                continue;
            }
            // Contradiction indicator: opposed stance on near-identical
            // content.
            if a.stance * b.stance >= 0.0 {
                continue;
            }

            let score_a = composite(a, now);
            let score_b = composite(b, now);

            if (score_a - score_b).abs() < AMBIGUITY_MARGIN {
                resolutions.push(Resolution::FlagAmbiguous {
                    a: a.id.clone(),
                    b: b.id.clone(),
                });
                continue;
            }

            let (winner, loser) = if score_a > score_b { (i, j) } else { (j, i) };
            consumed[loser] = true;
            resolutions.push(Resolution::Supersede {
                winner: memories[winner].id.clone(),
                loser: memories[loser].id.clone(),
            });
        }
    }
    resolutions
}

fn composite(memory: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let age_days = (now - memory.created_at).num_hours() as f64 / 24.0;
    let recency = 0.5f64.powf(age_days.max(0.0) / RECENCY_HALF_LIFE_DAYS);
    // Usefulness 0 would zero everything out for never-scored memories,
    // so floor it.
    let usefulness = memory.usefulness.value().max(0.1);
    usefulness * memory.confidence.value() * recency
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{Confidence, MemoryKind, TypedContent, Usefulness};

    fn memory(text: &str, stance: f64, confidence: f64, age_days: i64) -> MemoryRecord {
        let mut m = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, text),
            vec![],
        );
        m.stance = stance;
        m.confidence = Confidence::new(confidence);
        m.usefulness = Usefulness::new(0.8);
        m.created_at = Utc::now() - chrono::Duration::days(age_days);
        m
    }

    #[test]
    fn opposed_near_duplicates_supersede() {
        let memories = vec![
            memory("the cache is enabled in prod", 0.9, 0.95, 1),
            memory("the cache is enabled in prod", -0.9, 0.3, 40),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let resolutions = resolve_conflicts(&memories, &embeddings, Utc::now());

        assert_eq!(resolutions.len(), 1);
        match &resolutions[0] {
            Resolution::Supersede { winner, loser } => {
                assert_eq!(winner, &memories[0].id);
                assert_eq!(loser, &memories[1].id);
            }
            other => panic!("expected supersede, got {other:?}"),
        }
    }

    #[test]
    fn same_stance_pairs_are_not_conflicts() {
        let memories = vec![
            memory("fact", 0.5, 0.9, 1),
            memory("fact", 0.5, 0.9, 1),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        assert!(resolve_conflicts(&memories, &embeddings, Utc::now()).is_empty());
    }

    #[test]
    fn dissimilar_content_is_not_a_conflict() {
        let memories = vec![
            memory("cache enabled", 0.9, 0.9, 1),
            memory("unrelated topic", -0.9, 0.9, 1),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(resolve_conflicts(&memories, &embeddings, Utc::now()).is_empty());
    }

    #[test]
    fn near_equal_scores_flag_ambiguous() {
        let memories = vec![
            memory("fact", 0.9, 0.9, 5),
            memory("fact", -0.9, 0.9, 5),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let resolutions = resolve_conflicts(&memories, &embeddings, Utc::now());
        assert!(matches!(resolutions[0], Resolution::FlagAmbiguous { .. }));
    }

    #[test]
    fn resolution_is_deterministic_across_runs() {
        let memories = vec![
            memory("fact", 0.9, 0.95, 1),
            memory("fact", -0.9, 0.2, 50),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let a = resolve_conflicts(&memories, &embeddings, Utc::now());
        let b = resolve_conflicts(&memories, &embeddings, Utc::now());
        assert_eq!(a, b);
    }
}
