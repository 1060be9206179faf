//! Typed memory kinds. Content is a tagged enum so the kind survives
//! serialization into the single `memories` table.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The kind of a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MemoryKind {
    Episodic,
    Semantic,
    Procedural,
    Code,
    Task,
}

impl MemoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Code => "code",
            Self::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "episodic" => Some(Self::Episodic),
            "semantic" => Some(Self::Semantic),
            "procedural" => Some(Self::Procedural),
            "code" => Some(Self::Code),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remembered experience: what happened, in what situation, how it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicContent {
    pub what: String,
    pub context: String,
    pub outcome: Option<String>,
}

/// A stable fact or insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticContent {
    pub fact: String,
    /// Ids of the episodic events this fact was promoted from, if any.
    #[serde(default)]
    pub source_events: Vec<String>,
}

/// How-to knowledge with an optional invocation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralContent {
    pub description: String,
    pub steps: Vec<String>,
    /// Present when the procedure can be invoked mechanically.
    pub invocation: Option<String>,
}

/// Code-anchored knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeContent {
    pub snippet: String,
    pub language: String,
    pub path: Option<String>,
}

/// Knowledge about a unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    pub description: String,
    pub outcome: Option<String>,
}

/// Typed content wrapper — each memory kind has its own content struct.
/// Serialized as a tagged enum so the kind is preserved in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum TypedContent {
    Episodic(EpisodicContent),
    Semantic(SemanticContent),
    Procedural(ProceduralContent),
    Code(CodeContent),
    Task(TaskContent),
}

impl TypedContent {
    /// The kind this content belongs to.
    pub fn kind(&self) -> MemoryKind {
        match self {
            Self::Episodic(_) => MemoryKind::Episodic,
            Self::Semantic(_) => MemoryKind::Semantic,
            Self::Procedural(_) => MemoryKind::Procedural,
            Self::Code(_) => MemoryKind::Code,
            Self::Task(_) => MemoryKind::Task,
        }
    }

    /// The text that gets embedded and searched.
    pub fn text(&self) -> &str {
        match self {
            Self::Episodic(c) => &c.what,
            Self::Semantic(c) => &c.fact,
            Self::Procedural(c) => &c.description,
            Self::Code(c) => &c.snippet,
            Self::Task(c) => &c.description,
        }
    }

    /// Wrap plain text in the content struct for a kind.
    pub fn from_text(kind: MemoryKind, text: impl Into<String>) -> Self {
        let text = text.into();
        match kind {
            MemoryKind::Episodic => Self::Episodic(EpisodicContent {
                what: text,
                context: String::new(),
                outcome: None,
            }),
            MemoryKind::Semantic => Self::Semantic(SemanticContent {
                fact: text,
                source_events: vec![],
            }),
            MemoryKind::Procedural => Self::Procedural(ProceduralContent {
                description: text,
                steps: vec![],
                invocation: None,
            }),
            MemoryKind::Code => Self::Code(CodeContent {
                snippet: text,
                language: String::new(),
                path: None,
            }),
            MemoryKind::Task => Self::Task(TaskContent {
                description: text,
                outcome: None,
            }),
        }
    }
}
