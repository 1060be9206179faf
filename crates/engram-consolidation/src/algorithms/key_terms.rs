//! Distinctive-term extraction over an event cluster (TF-IDF).
//!
//! Used to name patterns: the terms that distinguish a cluster from the
//! corpus become the pattern template's subject.

use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "have", "been", "from", "this", "that", "with", "they", "will", "each",
    "which", "their", "what", "its", "into", "more", "other", "then", "when", "were", "there",
];

/// Top `limit` distinctive terms across the documents, scored by TF-IDF,
/// ties broken alphabetically for determinism.
pub fn distinctive_terms(documents: &[String], limit: usize) -> Vec<(String, f64)> {
    if documents.is_empty() {
        return Vec::new();
    }

    let n_docs = documents.len() as f64;
    let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let mut term_freq: HashMap<&str, usize> = HashMap::new();
    let mut total_terms = 0usize;
    for tokens in &tokenized {
        for token in tokens {
            *term_freq.entry(token).or_insert(0) += 1;
            total_terms += 1;
        }
    }
    if total_terms == 0 {
        return Vec::new();
    }

    let mut scores: Vec<(String, f64)> = term_freq
        .iter()
        .map(|(term, &count)| {
            let df = doc_freq.get(term).copied().unwrap_or(1) as f64;
            let tf = count as f64 / total_terms as f64;
            let idf = (n_docs / df).ln() + 1.0;
            (term.to_string(), tf * idf)
        })
        .collect();

    scores.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scores.truncate(limit);
    scores
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_subject_ranks_high() {
        let docs = vec![
            "deploy the api service to staging".to_string(),
            "deploy completed after migration".to_string(),
            "rollback then deploy again".to_string(),
        ];
        let terms = distinctive_terms(&docs, 5);
        let names: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
        assert!(names.contains(&"deploy"));
    }

    #[test]
    fn stop_words_are_excluded() {
        let docs = vec!["the and for with this that".to_string()];
        assert!(distinctive_terms(&docs, 5).is_empty());
    }

    #[test]
    fn empty_corpus_is_empty() {
        assert!(distinctive_terms(&[], 5).is_empty());
    }

    #[test]
    fn deterministic_ordering_on_ties() {
        let docs = vec!["zebra apple".to_string()];
        let a = distinctive_terms(&docs, 2);
        let b = distinctive_terms(&docs, 2);
        assert_eq!(a, b);
        assert_eq!(a[0].0, "apple");
    }
}
