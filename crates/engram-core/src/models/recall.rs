//! Retrieval surface shapes: strategies, options, and hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::memory::MemoryKind;

/// Retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Strategy {
    Vector,
    Keyword,
    Hybrid,
    Graph,
    Temporal,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
            Self::Graph => "graph",
            Self::Temporal => "temporal",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a `recall` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallOptions {
    /// Number of hits wanted.
    pub k: usize,
    /// Force a strategy instead of letting the router choose.
    pub strategy: Option<Strategy>,
    /// Restrict to these kinds.
    #[serde(default)]
    pub kinds: Vec<MemoryKind>,
    /// Restrict to records carrying all of these tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Include superseded records.
    pub include_superseded: bool,
    /// Mark hits labile for supervised update.
    pub reconsolidate: bool,
}

impl RecallOptions {
    pub fn top_k(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }
}

/// One recall result.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecallHit {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub kind: MemoryKind,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
    /// Which strategy surfaced this hit and why.
    pub explanation: String,
    /// Lock token for reconsolidation updates; present only when the
    /// query asked to reconsolidate.
    pub lock_token: Option<u64>,
}
