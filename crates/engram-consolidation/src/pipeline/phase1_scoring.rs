//! Phase 1: Scoring — usefulness per unconsolidated event.
//!
//! usefulness = 0.2·access + 0.3·confidence + 0.2·recency + 0.3·surprise,
//! every component normalized into [0, 1].

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use engram_core::memory::Usefulness;
use engram_core::models::EpisodicEvent;

const W_ACCESS: f64 = 0.2;
const W_CONFIDENCE: f64 = 0.3;
const W_RECENCY: f64 = 0.2;
const W_SURPRISE: f64 = 0.3;

/// Access counts at or above this saturate the access component.
const ACCESS_SATURATION: f64 = 10.0;

/// Recency half-life for the boost, in hours.
const RECENCY_HALF_LIFE_HOURS: f64 = 72.0;

/// An event with its assigned usefulness.
#[derive(Debug, Clone)]
pub struct ScoredEvent {
    pub index: usize,
    pub usefulness: Usefulness,
}

/// Score all events in parallel. Output order matches input order.
pub fn score_events(events: &[EpisodicEvent], now: DateTime<Utc>) -> Vec<ScoredEvent> {
    events
        .par_iter()
        .enumerate()
        .map(|(index, event)| ScoredEvent {
            index,
            usefulness: score_one(event, now),
        })
        .collect()
}

fn score_one(event: &EpisodicEvent, now: DateTime<Utc>) -> Usefulness {
    let access = (event.access_count as f64 / ACCESS_SATURATION).min(1.0);
    let confidence = event.confidence.clamp(0.0, 1.0);
    let age_hours = (now - event.timestamp).num_minutes() as f64 / 60.0;
    let recency = 0.5f64.powf(age_hours.max(0.0) / RECENCY_HALF_LIFE_HOURS);
    let surprise = event.surprise.clamp(0.0, 1.0);

    Usefulness::new(
        W_ACCESS * access + W_CONFIDENCE * confidence + W_RECENCY * recency + W_SURPRISE * surprise,
    )
}
