//! Graph-layer entities and typed relations. Relations are
//! soft-invalidated via `valid_until` rather than deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{Confidence, Strength};

/// A named entity with accumulated observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            name: name.into(),
            entity_type: entity_type.into(),
            observations: vec![],
            created_at: Utc::now(),
        }
    }
}

/// Relation types used by consolidation conflict detection and graph walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Reinforces,
    Contradicts,
    Extends,
    DependsOn,
    CausedBy,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reinforces => "reinforces",
            Self::Contradicts => "contradicts",
            Self::Extends => "extends",
            Self::DependsOn => "depends_on",
            Self::CausedBy => "caused_by",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reinforces" => Some(Self::Reinforces),
            "contradicts" => Some(Self::Contradicts),
            "extends" => Some(Self::Extends),
            "depends_on" => Some(Self::DependsOn),
            "caused_by" => Some(Self::CausedBy),
            _ => None,
        }
    }
}

/// A typed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub project_id: String,
    pub from_entity: String,
    pub to_entity: String,
    pub relation_type: RelationType,
    pub strength: Strength,
    pub confidence: Confidence,
    pub valid_from: DateTime<Utc>,
    /// Soft invalidation; None means currently valid.
    pub valid_until: Option<DateTime<Utc>>,
}

impl Relation {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| at < until)
    }
}
