//! Associative-network shapes: links, transient activation, priming,
//! inhibition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::Strength;

/// Which memory layer an endpoint lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    Working,
    Episodic,
    Semantic,
    Procedural,
    Prospective,
    Graph,
    Meta,
}

impl MemoryLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Prospective => "prospective",
            Self::Graph => "graph",
            Self::Meta => "meta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "working" => Some(Self::Working),
            "episodic" => Some(Self::Episodic),
            "semantic" => Some(Self::Semantic),
            "procedural" => Some(Self::Procedural),
            "prospective" => Some(Self::Prospective),
            "graph" => Some(Self::Graph),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

/// Association link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Semantic,
    Temporal,
    Causal,
    Similarity,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Temporal => "temporal",
            Self::Causal => "causal",
            Self::Similarity => "similarity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(Self::Semantic),
            "temporal" => Some(Self::Temporal),
            "causal" => Some(Self::Causal),
            "similarity" => Some(Self::Similarity),
            _ => None,
        }
    }
}

/// One adjacency row. (from_id, to_id, link_type) is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationLink {
    pub from_id: String,
    pub from_layer: MemoryLayer,
    pub to_id: String,
    pub to_layer: MemoryLayer,
    pub link_type: LinkType,
    pub strength: Strength,
    pub co_occurrence_count: u64,
    pub last_strengthened: DateTime<Utc>,
}

/// Transient spreading-activation state for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationState {
    pub item_id: String,
    pub level: f64,
    pub hop_distance: usize,
    pub activated_at: DateTime<Utc>,
}

/// A primed item: retrieval boost until expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priming {
    pub item_id: String,
    pub strength: Strength,
    pub expires_at: DateTime<Utc>,
}

/// Inhibition flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InhibitionType {
    Proactive,
    Retroactive,
    Selective,
}

impl InhibitionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proactive => "proactive",
            Self::Retroactive => "retroactive",
            Self::Selective => "selective",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proactive" => Some(Self::Proactive),
            "retroactive" => Some(Self::Retroactive),
            "selective" => Some(Self::Selective),
            _ => None,
        }
    }
}

/// A suppressed item: excluded from retrieval until expiry or decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inhibition {
    pub item_id: String,
    pub strength: Strength,
    pub inhibition_type: InhibitionType,
    pub expires_at: DateTime<Utc>,
}

impl Inhibition {
    /// Active means not expired and still above the release threshold.
    pub fn is_active(&self, now: DateTime<Utc>, release_threshold: f64) -> bool {
        now < self.expires_at && self.strength.value() >= release_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn inhibition_expires_by_ttl() {
        let inhibition = Inhibition {
            item_id: "m1".into(),
            strength: Strength::new(0.9),
            inhibition_type: InhibitionType::Selective,
            expires_at: Utc::now() + Duration::seconds(60),
        };
        assert!(inhibition.is_active(Utc::now(), 0.1));
        assert!(!inhibition.is_active(Utc::now() + Duration::seconds(120), 0.1));
    }

    #[test]
    fn inhibition_releases_below_threshold() {
        let inhibition = Inhibition {
            item_id: "m1".into(),
            strength: Strength::new(0.05),
            inhibition_type: InhibitionType::Proactive,
            expires_at: Utc::now() + Duration::seconds(60),
        };
        assert!(!inhibition.is_active(Utc::now(), 0.1));
    }
}
