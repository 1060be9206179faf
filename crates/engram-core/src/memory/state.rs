//! Consolidation lifecycle of a memory record.

use serde::{Deserialize, Serialize};

/// Where a memory sits in its consolidation lifecycle.
///
/// unconsolidated → consolidating → consolidated,
/// consolidated ⇌ labile ⇌ reconsolidating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationState {
    Unconsolidated,
    Consolidating,
    Consolidated,
    Labile,
    Reconsolidating,
}

impl ConsolidationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconsolidated => "unconsolidated",
            Self::Consolidating => "consolidating",
            Self::Consolidated => "consolidated",
            Self::Labile => "labile",
            Self::Reconsolidating => "reconsolidating",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unconsolidated" => Some(Self::Unconsolidated),
            "consolidating" => Some(Self::Consolidating),
            "consolidated" => Some(Self::Consolidated),
            "labile" => Some(Self::Labile),
            "reconsolidating" => Some(Self::Reconsolidating),
            _ => None,
        }
    }

    /// Whether a supervised update is permitted in this state.
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Labile | Self::Reconsolidating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_labile_states_are_mutable() {
        assert!(ConsolidationState::Labile.is_mutable());
        assert!(ConsolidationState::Reconsolidating.is_mutable());
        assert!(!ConsolidationState::Consolidated.is_mutable());
        assert!(!ConsolidationState::Unconsolidated.is_mutable());
    }
}
