//! Working-memory items. The buffer logic lives in `engram-working`;
//! this is the shared shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::memory::Activation;

/// Baddeley-style working-memory component tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Component {
    Phonological,
    VisuoSpatial,
    EpisodicBuffer,
    CentralExecutive,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phonological => "phonological",
            Self::VisuoSpatial => "visuo-spatial",
            Self::EpisodicBuffer => "episodic-buffer",
            Self::CentralExecutive => "central-executive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "phonological" => Some(Self::Phonological),
            "visuo-spatial" => Some(Self::VisuoSpatial),
            "episodic-buffer" => Some(Self::EpisodicBuffer),
            "central-executive" => Some(Self::CentralExecutive),
            _ => None,
        }
    }
}

/// One item in the bounded working buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingItem {
    pub id: String,
    pub project_id: String,
    pub content: String,
    pub component: Component,
    pub activation: Activation,
    /// Importance in [0, 1]; slows decay.
    pub importance: f64,
    /// Per-item decay constant k.
    pub decay_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Pinned items survive focus switches with the context snapshot.
    pub pinned: bool,
}

impl WorkingItem {
    pub fn new(
        project_id: impl Into<String>,
        content: impl Into<String>,
        component: Component,
        importance: f64,
        decay_rate: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            content: content.into(),
            component,
            activation: Activation::default(),
            importance: importance.clamp(0.0, 1.0),
            decay_rate,
            created_at: now,
            last_accessed: now,
            pinned: false,
        }
    }

    /// Activation at time `now`: a(t) = a0·exp(−k·(1 − 0.5·importance)·Δt).
    pub fn activation_at(&self, now: DateTime<Utc>) -> f64 {
        let dt_sec = (now - self.last_accessed).num_milliseconds() as f64 / 1000.0;
        if dt_sec <= 0.0 {
            return self.activation.value();
        }
        let k = self.decay_rate * (1.0 - 0.5 * self.importance);
        self.activation.value() * (-k * dt_sec).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn activation_decays_with_time() {
        let item = WorkingItem::new("p1", "x", Component::Phonological, 0.0, 0.1);
        let later = item.last_accessed + Duration::seconds(10);
        let a = item.activation_at(later);
        assert!(a < 1.0);
        assert!((a - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn importance_slows_decay() {
        let plain = WorkingItem::new("p1", "x", Component::Phonological, 0.0, 0.1);
        let important = WorkingItem::new("p1", "y", Component::Phonological, 1.0, 0.1);
        let later = plain.last_accessed + Duration::seconds(30);
        assert!(important.activation_at(later) > plain.activation_at(later));
    }

    #[test]
    fn activation_does_not_grow_backwards_in_time() {
        let item = WorkingItem::new("p1", "x", Component::EpisodicBuffer, 0.5, 0.1);
        let earlier = item.last_accessed - Duration::seconds(5);
        assert_eq!(item.activation_at(earlier), item.activation.value());
    }
}
