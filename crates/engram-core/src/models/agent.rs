use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Failed,
    Offline,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "failed" => Some(Self::Failed),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }
}

/// A registered agent with a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub agent_type: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub status: AgentStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub current_task: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        agent_type: impl Into<String>,
        capabilities: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            capabilities,
            status: AgentStatus::Idle,
            last_heartbeat: now,
            current_task: None,
            registered_at: now,
        }
    }

    /// Whether the heartbeat is older than the staleness threshold.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_threshold_ms: u64) -> bool {
        (now - self.last_heartbeat).num_milliseconds() > stale_threshold_ms as i64
    }
}
