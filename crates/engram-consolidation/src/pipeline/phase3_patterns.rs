//! Phase 3: Pattern extraction.
//!
//! Each cluster of at least `min_cluster_size` events emits one pattern:
//! a type classified from the members' event types and outcomes, a
//! natural-language template built from the cluster's distinctive terms,
//! and confidence = mean member confidence · size factor.

use chrono::Utc;

use engram_core::memory::Confidence;
use engram_core::models::{EpisodicEvent, Pattern, PatternType};

use crate::algorithms::key_terms;
use crate::pipeline::phase1_scoring::ScoredEvent;

/// Number of distinctive terms in a template.
const TEMPLATE_TERMS: usize = 4;

/// Extract one pattern per qualifying cluster. Output order follows the
/// (already deterministic) cluster order.
pub fn extract_patterns(
    run_id: &str,
    project_id: &str,
    events: &[EpisodicEvent],
    scored: &[ScoredEvent],
    clusters: &[Vec<usize>],
) -> Vec<Pattern> {
    clusters
        .iter()
        .filter(|cluster| !cluster.is_empty())
        .map(|cluster| build_pattern(run_id, project_id, events, scored, cluster))
        .collect()
}

fn build_pattern(
    run_id: &str,
    project_id: &str,
    events: &[EpisodicEvent],
    scored: &[ScoredEvent],
    cluster: &[usize],
) -> Pattern {
    let members: Vec<&EpisodicEvent> = cluster.iter().map(|&i| &events[i]).collect();
    let pattern_type = classify(&members);

    let documents: Vec<String> = members.iter().map(|e| e.content.clone()).collect();
    let terms = key_terms::distinctive_terms(&documents, TEMPLATE_TERMS);
    let subject = if terms.is_empty() {
        members[0].event_type.clone()
    } else {
        terms
            .iter()
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let template = match pattern_type {
        PatternType::Workflow => format!(
            "Recurring workflow around {subject}: {} related steps observed in one session window.",
            members.len()
        ),
        PatternType::Causal => format!(
            "Outcomes involving {subject} consistently follow the same trigger ({} observations).",
            members.len()
        ),
        PatternType::Preference => {
            format!("Stable preference signal around {subject} across {} events.", members.len())
        }
        PatternType::ErrorHandling => format!(
            "Failure-recovery sequence around {subject} repeated {} times.",
            members.len()
        ),
    };

    let mean_confidence = members.iter().map(|e| e.confidence).sum::<f64>() / members.len() as f64;
    let size_factor = size_factor(members.len());

    // Source ids sorted for a stable, comparable record.
    let mut source_events: Vec<String> = members.iter().map(|e| e.id.clone()).collect();
    source_events.sort_unstable();

    let usefulness_note = scored
        .iter()
        .filter(|s| cluster.contains(&s.index))
        .map(|s| s.usefulness.value())
        .fold(0.0f64, f64::max);

    Pattern {
        id: uuid::Uuid::new_v4().to_string(),
        run_id: run_id.to_string(),
        project_id: project_id.to_string(),
        pattern_type,
        content: template,
        confidence: Confidence::new(mean_confidence * size_factor * (0.9 + 0.1 * usefulness_note)),
        occurrences: members.len() as u64,
        source_events,
        created_at: Utc::now(),
    }
}

/// Confidence scales with cluster size, saturating at 1.0 by size 5.
fn size_factor(size: usize) -> f64 {
    (0.6 + 0.1 * size as f64).min(1.0)
}

/// Classify the dominant pattern type of a cluster.
fn classify(members: &[&EpisodicEvent]) -> PatternType {
    let failures = members
        .iter()
        .filter(|e| {
            e.outcome
                .as_deref()
                .is_some_and(|o| o.contains("fail") || o.contains("error"))
        })
        .count();
    if failures * 2 > members.len() {
        return PatternType::ErrorHandling;
    }

    let preference_signals = members
        .iter()
        .filter(|e| e.content.contains("prefer") || e.event_type == "preference")
        .count();
    if preference_signals * 2 > members.len() {
        return PatternType::Preference;
    }

    let outcomes = members.iter().filter(|e| e.outcome.is_some()).count();
    if outcomes == members.len() && members.len() >= 3 {
        return PatternType::Causal;
    }

    PatternType::Workflow
}
