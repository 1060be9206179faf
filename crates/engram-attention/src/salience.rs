//! Salience scoring for incoming items.
//!
//! novelty = 1 − max cosine similarity to the top-K semantic neighbors;
//! surprise = |observed − predicted| when a prediction exists;
//! contradiction = max similarity among stance-flipped near-duplicates.
//! The composite aggregator is configured (max or weighted sum).

use engram_core::config::{AttentionConfig, SalienceAggregator};
use engram_core::models::SalienceScore;
use engram_index::cosine_similarity;

/// Everything the scorer needs about the incoming item and its
/// neighborhood.
pub struct SalienceInputs<'a> {
    pub embedding: &'a [f32],
    pub stance: f64,
    /// (embedding, stance) of the top-K nearest semantic memories.
    pub neighbors: &'a [(Vec<f32>, f64)],
    /// (observed, predicted) outcome pair, when a prediction existed.
    pub outcome: Option<(f64, f64)>,
}

/// Compute the salience components and composite for an incoming item.
pub fn score_salience(inputs: &SalienceInputs<'_>, config: &AttentionConfig) -> SalienceScore {
    let mut max_similarity = 0.0f64;
    let mut max_contradiction = 0.0f64;

    for (neighbor_embedding, neighbor_stance) in inputs.neighbors {
        let similarity = cosine_similarity(inputs.embedding, neighbor_embedding).max(0.0);
        max_similarity = max_similarity.max(similarity);

        // Contradiction: near-duplicate content with an opposed stance.
        if inputs.stance * neighbor_stance < 0.0 {
            max_contradiction = max_contradiction.max(similarity);
        }
    }

    let novelty = 1.0 - max_similarity;
    let surprise = inputs
        .outcome
        .map(|(observed, predicted)| (observed - predicted).abs())
        .unwrap_or(0.0);
    let contradiction = max_contradiction;

    let composite = match config.aggregator {
        SalienceAggregator::Max => novelty.max(surprise).max(contradiction),
        SalienceAggregator::WeightedSum => {
            novelty * config.novelty_weight
                + surprise * config.surprise_weight
                + contradiction * config.contradiction_weight
        }
    };

    SalienceScore::clamped(novelty, surprise, contradiction, composite)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AttentionConfig {
        AttentionConfig::default()
    }

    #[test]
    fn unseen_content_is_maximally_novel() {
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.0,
            neighbors: &[],
            outcome: None,
        };
        let score = score_salience(&inputs, &config());
        assert_eq!(score.novelty, 1.0);
        assert_eq!(score.composite, 1.0);
    }

    #[test]
    fn duplicate_content_has_zero_novelty() {
        let neighbors = vec![(vec![1.0, 0.0], 0.5)];
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.5,
            neighbors: &neighbors,
            outcome: None,
        };
        let score = score_salience(&inputs, &config());
        assert!(score.novelty < 1e-9);
        assert!(score.contradiction < 1e-9);
    }

    #[test]
    fn opposed_stance_near_duplicate_scores_contradiction() {
        let neighbors = vec![(vec![1.0, 0.0], -0.8)];
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.8,
            neighbors: &neighbors,
            outcome: None,
        };
        let score = score_salience(&inputs, &config());
        assert!((score.contradiction - 1.0).abs() < 1e-9);
        // Max aggregator: composite picks up the contradiction.
        assert!((score.composite - 1.0).abs() < 1e-9);
    }

    #[test]
    fn surprise_is_outcome_gap() {
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.0,
            neighbors: &[(vec![1.0, 0.0], 0.0)],
            outcome: Some((0.9, 0.2)),
        };
        let score = score_salience(&inputs, &config());
        assert!((score.surprise - 0.7).abs() < 1e-9);
    }

    #[test]
    fn weighted_sum_aggregator_blends_components() {
        let mut cfg = config();
        cfg.aggregator = SalienceAggregator::WeightedSum;
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.0,
            neighbors: &[],
            outcome: Some((1.0, 0.0)),
        };
        let score = score_salience(&inputs, &cfg);
        let expected = 1.0 * cfg.novelty_weight + 1.0 * cfg.surprise_weight;
        assert!((score.composite - expected).abs() < 1e-9);
    }

    #[test]
    fn composite_is_always_clamped() {
        let mut cfg = config();
        cfg.aggregator = SalienceAggregator::WeightedSum;
        cfg.novelty_weight = 5.0;
        let inputs = SalienceInputs {
            embedding: &[1.0, 0.0],
            stance: 0.0,
            neighbors: &[],
            outcome: None,
        };
        let score = score_salience(&inputs, &cfg);
        assert_eq!(score.composite, 1.0);
    }
}
