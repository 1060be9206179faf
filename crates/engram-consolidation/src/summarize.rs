//! Executive-summary generation for the compression phase.
//!
//! The extractive summarizer is the default (no external dependency); an
//! LLM adapter can be injected instead. Either way the phase records the
//! token compression ratio and a fidelity score.

use std::collections::HashSet;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

use engram_core::errors::EngramResult;
use engram_core::traits::ISummarizer;

use crate::algorithms::textrank;

/// Roughly how many sentences per compression level.
fn sentences_for_target(target_tokens: usize) -> usize {
    // ~20 tokens per summary sentence.
    (target_tokens / 20).clamp(1, 5)
}

/// Extractive summarizer: TextRank over the original content.
pub struct ExtractiveSummarizer;

impl ISummarizer for ExtractiveSummarizer {
    fn summarize(&self, text: &str, target_tokens: usize) -> EngramResult<String> {
        Ok(textrank::extract_summary(
            text,
            sentences_for_target(target_tokens),
        ))
    }

    fn name(&self) -> &str {
        "extractive"
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn bpe() -> &'static CoreBPE {
    static BPE: OnceLock<CoreBPE> = OnceLock::new();
    BPE.get_or_init(|| tiktoken_rs::cl100k_base().expect("bundled cl100k tables"))
}

/// Token count used for compression metrics.
pub fn count_tokens(text: &str) -> usize {
    bpe().encode_with_special_tokens(text).len()
}

/// Compression ratio: summary tokens / original tokens. 1.0 when the
/// original is empty.
pub fn compression_ratio(original: &str, summary: &str) -> f64 {
    let original_tokens = count_tokens(original);
    if original_tokens == 0 {
        return 1.0;
    }
    count_tokens(summary) as f64 / original_tokens as f64
}

/// Fidelity: lexical overlap between summary and original (Jaccard over
/// lowercased alphanumeric tokens). Extractive summaries score high by
/// construction; an LLM summary that drifts scores low.
pub fn fidelity_score(original: &str, summary: &str) -> f64 {
    let original_terms = term_set(original);
    let summary_terms = term_set(summary);
    if summary_terms.is_empty() {
        return 0.0;
    }
    let overlap = summary_terms.intersection(&original_terms).count() as f64;
    overlap / summary_terms.len() as f64
}

fn term_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}
