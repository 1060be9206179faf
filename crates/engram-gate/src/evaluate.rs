//! Rule evaluation. Violations are data: the evaluator returns a
//! structured result with severities and suggestions, never an error.

use engram_core::models::{CandidateChange, Rule, RuleValidation, Violation};

/// Evaluate a change against the enabled rules.
///
/// A rule violates when its condition matches the change description or
/// target (case-insensitive substring) and no exception pattern matches.
pub fn evaluate_change(change: &CandidateChange, rules: &[Rule]) -> RuleValidation {
    let haystack = format!(
        "{} {} {}",
        change.change_type, change.description, change.target
    )
    .to_lowercase();

    let mut violations = Vec::new();
    let mut suggestions = Vec::new();

    for rule in rules {
        if !rule.enabled {
            continue;
        }
        let condition = rule.condition.to_lowercase();
        if condition.is_empty() || !haystack.contains(&condition) {
            continue;
        }
        if let Some(exception) = &rule.exception {
            if !exception.is_empty() && haystack.contains(&exception.to_lowercase()) {
                continue;
            }
        }

        violations.push(Violation {
            rule_id: rule.id.clone(),
            category: rule.category,
            severity: rule.severity,
            message: format!(
                "{} rule matched: \"{}\"",
                rule.category.as_str(),
                rule.condition
            ),
        });
        if rule.can_override {
            suggestions.push(format!(
                "rule {} can be overridden with an approval request",
                rule.id
            ));
        }
    }

    RuleValidation {
        compliant: violations.is_empty(),
        violations,
        suggestions,
    }
}

/// Confidence for the gate decision, derived from change type and the
/// caller-supplied evidence weight.
pub fn change_confidence(change: &CandidateChange) -> f64 {
    let type_weight = match change.change_type.as_str() {
        // Routine, reversible operations.
        "memory_update" | "tag_update" | "compression" => 0.8,
        // Structural but recoverable via snapshots.
        "rule_update" | "entity_merge" | "promotion" => 0.6,
        // Destructive.
        "forget" | "project_delete" => 0.3,
        _ => 0.5,
    };
    (type_weight * 0.5 + change.evidence.clamp(0.0, 1.0) * 0.5).clamp(0.0, 1.0)
}
