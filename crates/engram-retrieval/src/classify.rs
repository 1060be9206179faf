//! Query classification heuristic.
//!
//! Precedence: time expression → temporal; known entity names → graph;
//! only quoted or all-caps technical tokens → keyword; question or
//! paraphrase → vector; mixed → hybrid.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use engram_core::models::Strategy;

fn time_expression() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(yesterday|today|tonight|last\s+(week|month|year|night)|this\s+(week|month|morning)|\d+\s+(minutes?|hours?|days?|weeks?|months?)\s+ago|since\s+\d{4}|on\s+\d{4}-\d{2}-\d{2})\b",
        )
        .expect("time expression regex")
    })
}

fn question_lead() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(what|why|how|when|where|who|which|did|does|do|is|are|can|could|should)\b")
            .expect("question regex")
    })
}

/// Classify a query, given the entity names known to the project graph.
pub fn classify(query: &str, known_entities: &HashSet<String>) -> Strategy {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Strategy::Keyword;
    }

    if time_expression().is_match(trimmed) {
        return Strategy::Temporal;
    }

    // A fully quoted phrase is an exact-match request.
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        return Strategy::Keyword;
    }

    let lowered = trimmed.to_lowercase();
    if known_entities
        .iter()
        .any(|name| contains_word(&lowered, &name.to_lowercase()))
    {
        return Strategy::Graph;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let technical = tokens
        .iter()
        .filter(|t| is_quoted(t) || is_all_caps_technical(t))
        .count();
    if technical == tokens.len() {
        return Strategy::Keyword;
    }

    let is_question = trimmed.ends_with('?') || question_lead().is_match(trimmed);
    if is_question && technical == 0 {
        return Strategy::Vector;
    }

    Strategy::Hybrid
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.split(|c: char| !c.is_alphanumeric()).any(|w| w == needle)
}

fn is_quoted(token: &str) -> bool {
    (token.starts_with('"') && token.ends_with('"') && token.len() >= 2)
        || (token.starts_with('\'') && token.ends_with('\'') && token.len() >= 2)
}

fn is_all_caps_technical(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}
