//! Rank fusion for the hybrid strategy.
//!
//! Hybrid combines the vector and keyword rankings positionally:
//! fused = w·rank_score_v + (1−w)·rank_score_k, where each rank score is
//! 1/(1+rank). Per-source ranks ride along for explanations.

use std::collections::HashMap;

/// A fused candidate with per-source rank provenance.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub memory_id: String,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

/// Fuse two ranked id lists. `vector_weight` is w; ids present in only
/// one list contribute only that side's term.
pub fn fuse_ranked(
    vector_ids: &[String],
    keyword_ids: &[String],
    vector_weight: f64,
) -> Vec<FusedCandidate> {
    let w = vector_weight.clamp(0.0, 1.0);
    let mut vector_ranks: HashMap<&str, usize> = HashMap::new();
    let mut keyword_ranks: HashMap<&str, usize> = HashMap::new();

    for (rank, id) in vector_ids.iter().enumerate() {
        vector_ranks.entry(id.as_str()).or_insert(rank);
    }
    for (rank, id) in keyword_ids.iter().enumerate() {
        keyword_ranks.entry(id.as_str()).or_insert(rank);
    }

    let mut all_ids: Vec<&str> = vector_ranks.keys().copied().collect();
    for id in keyword_ranks.keys() {
        if !vector_ranks.contains_key(id) {
            all_ids.push(id);
        }
    }

    let mut candidates: Vec<FusedCandidate> = all_ids
        .into_iter()
        .map(|id| {
            let vector_rank = vector_ranks.get(id).copied();
            let keyword_rank = keyword_ranks.get(id).copied();
            let v = vector_rank.map(rank_score).unwrap_or(0.0);
            let k = keyword_rank.map(rank_score).unwrap_or(0.0);
            FusedCandidate {
                memory_id: id.to_string(),
                score: w * v + (1.0 - w) * k,
                vector_rank,
                keyword_rank,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.memory_id.cmp(&b.memory_id))
    });
    candidates
}

fn rank_score(rank: usize) -> f64 {
    1.0 / (1.0 + rank as f64)
}
