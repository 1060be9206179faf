//! Graph-ranked extractive summarization.
//!
//! Sentences are nodes, word-overlap cosine is the edge weight, and a
//! PageRank iteration scores centrality. The summary keeps the top
//! sentences in their original order.

use std::collections::HashMap;

use engram_index::cosine_similarity;

use super::sentences::split_sentences;

const DAMPING: f64 = 0.85;
const CONVERGENCE: f64 = 1e-6;
const MAX_ITERATIONS: usize = 100;

/// Extract a summary of up to `num_sentences` sentences.
pub fn extract_summary(text: &str, num_sentences: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return String::new();
    }
    if sentences.len() <= num_sentences {
        return sentences.join(" ");
    }

    let scores = rank_sentences(&sentences);
    let mut indexed: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<usize> = indexed
        .iter()
        .take(num_sentences)
        .map(|(i, _)| *i)
        .collect();
    keep.sort_unstable();

    keep.iter()
        .map(|&i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// PageRank over the sentence-similarity graph.
fn rank_sentences(sentences: &[String]) -> Vec<f64> {
    let n = sentences.len();
    if n == 1 {
        return vec![1.0];
    }

    let vectors = term_vectors(sentences);
    let mut similarity = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let s = cosine_similarity(&vectors[i], &vectors[j]).max(0.0);
            similarity[i][j] = s;
            similarity[j][i] = s;
        }
    }

    // Precompute out-edge sums once per node.
    let out_sums: Vec<f64> = (0..n).map(|j| similarity[j].iter().sum()).collect();

    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![0.0f64; n];
        let mut max_diff = 0.0f64;

        for i in 0..n {
            let mut incoming = 0.0;
            for j in 0..n {
                if i != j && out_sums[j] > f64::EPSILON {
                    incoming += similarity[j][i] * scores[j] / out_sums[j];
                }
            }
            next[i] = (1.0 - DAMPING) / n as f64 + DAMPING * incoming;
            max_diff = max_diff.max((next[i] - scores[i]).abs());
        }

        scores = next;
        if max_diff < CONVERGENCE {
            break;
        }
    }
    scores
}

/// Bag-of-words term-frequency vectors over a shared vocabulary.
fn term_vectors(sentences: &[String]) -> Vec<Vec<f32>> {
    let mut vocab: HashMap<String, usize> = HashMap::new();
    for sentence in sentences {
        for word in sentence.split_whitespace() {
            let w = word.to_lowercase();
            let next_idx = vocab.len();
            vocab.entry(w).or_insert(next_idx);
        }
    }

    let dim = vocab.len();
    sentences
        .iter()
        .map(|s| {
            let mut v = vec![0.0f32; dim];
            for word in s.split_whitespace() {
                if let Some(&idx) = vocab.get(&word.to_lowercase()) {
                    v[idx] += 1.0;
                }
            }
            v
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_subset_of_input() {
        let text = "The deploy failed at midnight. The database migration locked a table. \
                    Retrying after the lock cleared succeeded. Coffee was consumed.";
        let summary = extract_summary(text, 2);
        assert!(!summary.is_empty());
        for sentence in split_sentences(&summary) {
            assert!(text.contains(&sentence));
        }
    }

    #[test]
    fn short_text_passes_through() {
        assert_eq!(extract_summary("Only one sentence.", 3), "Only one sentence.");
    }

    #[test]
    fn empty_text_summarizes_to_empty() {
        assert!(extract_summary("", 2).is_empty());
    }

    #[test]
    fn summary_preserves_original_order() {
        let text = "Alpha happened first. Beta came second. Alpha and beta repeated. \
                    Gamma closed it out.";
        let summary = extract_summary(text, 3);
        let alpha = summary.find("Alpha happened");
        let gamma = summary.find("Gamma");
        if let (Some(a), Some(g)) = (alpha, gamma) {
            assert!(a < g);
        }
    }
}
