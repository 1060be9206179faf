//! Per-run quality metrics and their targets.
//!
//! Misses are flagged on the run record; they never fail the run.

use engram_core::models::RunMetrics;

/// Configured targets. A metric at or above its target passes.
pub const TARGET_COMPRESSION: f64 = 0.3;
pub const TARGET_RECALL: f64 = 0.8;
pub const TARGET_CONSISTENCY: f64 = 0.5;
pub const TARGET_DENSITY: f64 = 0.05;

/// Names of metrics that missed their targets.
pub fn missed_targets(metrics: &RunMetrics) -> Vec<String> {
    let mut misses = Vec::new();
    if metrics.compression_ratio < TARGET_COMPRESSION {
        misses.push("compression_ratio".to_string());
    }
    if metrics.retrieval_recall < TARGET_RECALL {
        misses.push("retrieval_recall".to_string());
    }
    if metrics.pattern_consistency < TARGET_CONSISTENCY {
        misses.push("pattern_consistency".to_string());
    }
    if metrics.information_density < TARGET_DENSITY {
        misses.push("information_density".to_string());
    }
    misses
}

/// Jaccard similarity between two term sets, used for inter-run pattern
/// consistency. Both empty → 1.0 (nothing changed).
pub fn term_jaccard(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}
