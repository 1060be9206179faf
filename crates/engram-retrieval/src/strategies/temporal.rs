//! Temporal strategy: range scan with recency weighting.
//!
//! The range comes from a time expression in the query ("yesterday",
//! "3 days ago", "last week"); without one, the trailing 7 days.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use engram_core::errors::EngramResult;
use engram_core::memory::MemoryRecord;
use engram_core::traits::IMemoryStore;

use super::StrategyContext;

/// Recency half-life within the matched range, in hours.
const RECENCY_HALF_LIFE_HOURS: f64 = 24.0;

pub fn search(ctx: &StrategyContext<'_>) -> EngramResult<Vec<(MemoryRecord, f64)>> {
    ctx.deadline.check("temporal_search")?;
    let now = Utc::now();
    let (from, to) = parse_range(ctx.query, now);

    let memories = ctx
        .storage
        .search_temporal(ctx.project_id, from, to, ctx.k * 2)?;

    let mut results: Vec<(MemoryRecord, f64)> = memories
        .into_iter()
        .map(|memory| {
            let age_hours = (now - memory.created_at).num_minutes().max(0) as f64 / 60.0;
            let score = 0.5f64.powf(age_hours / RECENCY_HALF_LIFE_HOURS);
            (memory, score)
        })
        .collect();

    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    results.truncate(ctx.k);
    Ok(results)
}

fn days_ago_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d+)\s+(minutes?|hours?|days?|weeks?)\s+ago\b").expect("range regex")
    })
}

/// Resolve the query's time expression into [from, to].
pub fn parse_range(query: &str, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let lowered = query.to_lowercase();

    if lowered.contains("yesterday") {
        let start = now - Duration::days(1);
        return (start - Duration::hours(12), start + Duration::hours(12));
    }
    if lowered.contains("today") || lowered.contains("tonight") {
        return (now - Duration::hours(24), now);
    }
    if lowered.contains("last week") {
        return (now - Duration::days(14), now - Duration::days(7));
    }
    if lowered.contains("this week") {
        return (now - Duration::days(7), now);
    }
    if lowered.contains("last month") {
        return (now - Duration::days(60), now - Duration::days(30));
    }

    if let Some(caps) = days_ago_re().captures(&lowered) {
        let amount: i64 = caps[1].parse().unwrap_or(1);
        let unit = &caps[2];
        let offset = if unit.starts_with("minute") {
            Duration::minutes(amount)
        } else if unit.starts_with("hour") {
            Duration::hours(amount)
        } else if unit.starts_with("week") {
            Duration::weeks(amount)
        } else {
            Duration::days(amount)
        };
        let center = now - offset;
        let slop = offset / 4;
        return (center - slop, center + slop);
    }

    (now - Duration::days(7), now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yesterday_centers_on_minus_one_day() {
        let now = Utc::now();
        let (from, to) = parse_range("what broke yesterday", now);
        assert!(from < now - Duration::hours(24));
        assert!(to > now - Duration::hours(36));
    }

    #[test]
    fn n_days_ago_parses_amount() {
        let now = Utc::now();
        let (from, to) = parse_range("deploys 3 days ago", now);
        let center = now - Duration::days(3);
        assert!(from <= center && center <= to);
    }

    #[test]
    fn no_expression_defaults_to_trailing_week() {
        let now = Utc::now();
        let (from, to) = parse_range("anything recent", now);
        assert_eq!(to, now);
        assert_eq!(from, now - Duration::days(7));
    }
}
