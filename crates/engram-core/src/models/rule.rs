//! Project rules and structured validation results. Violations are data,
//! never errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    CodingStandard,
    Process,
    Security,
    Deployment,
    Resource,
    Quality,
    Custom,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodingStandard => "coding_standard",
            Self::Process => "process",
            Self::Security => "security",
            Self::Deployment => "deployment",
            Self::Resource => "resource",
            Self::Quality => "quality",
            Self::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "coding_standard" => Some(Self::CodingStandard),
            "process" => Some(Self::Process),
            "security" => Some(Self::Security),
            "deployment" => Some(Self::Deployment),
            "resource" => Some(Self::Resource),
            "quality" => Some(Self::Quality),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl RuleSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A project rule, user-authored or generated from patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub project_id: String,
    pub category: RuleCategory,
    /// Free-form sub-type within the category.
    pub rule_type: String,
    pub severity: RuleSeverity,
    /// Substring/keyword condition matched against change descriptions.
    pub condition: String,
    /// Exception pattern; matching changes are not violations.
    pub exception: Option<String>,
    pub enabled: bool,
    /// A violating rule with auto_block prevents auto-approval.
    pub auto_block: bool,
    pub can_override: bool,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(
        project_id: impl Into<String>,
        category: RuleCategory,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            category,
            rule_type: "keyword".into(),
            severity: RuleSeverity::Warning,
            condition: condition.into(),
            exception: None,
            enabled: true,
            auto_block: false,
            can_override: true,
            created_at: Utc::now(),
        }
    }
}

/// One rule violation inside a validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub category: RuleCategory,
    pub severity: RuleSeverity,
    pub message: String,
}

/// Structured result of validating a change against project rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleValidation {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub suggestions: Vec<String>,
}

/// What the gate decided about a candidate change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CandidateOutcome {
    AutoApproved,
    AutoRejected { reason: String },
    PendingApproval { request_id: String },
}
