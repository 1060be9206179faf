//! Per-project focus state machine.
//!
//! One primary focus at a time; optional secondary; any number of
//! background foci. Switches demote the previous primary and produce a
//! `TaskSwitch` record carrying the measured cost and the pinned
//! working-item snapshot.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use engram_core::errors::EngramResult;
use engram_core::models::{FocusState, FocusTarget, FocusTransition, TaskSwitch};

/// In-memory focus state per project. Switch records are handed back to
/// the caller for persistence.
#[derive(Default)]
pub struct FocusManager {
    states: Mutex<HashMap<String, FocusState>>,
}

impl FocusManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current focus state for a project.
    pub fn current(&self, project_id: &str) -> FocusState {
        self.states
            .lock()
            .expect("focus state poisoned")
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Switch primary focus. The previous primary becomes secondary on an
    /// interruption (so `Return` can restore it) and background otherwise.
    /// Returns the switch record for persistence.
    pub fn switch_primary(
        &self,
        project_id: &str,
        target_id: &str,
        label: &str,
        transition: FocusTransition,
        pinned_items: Vec<String>,
    ) -> EngramResult<TaskSwitch> {
        let started = Instant::now();
        let mut states = self.states.lock().expect("focus state poisoned");
        let state = states.entry(project_id.to_string()).or_default();

        let previous = state.primary.take();
        if let Some(prev) = previous.clone() {
            match transition {
                FocusTransition::Interruption => {
                    if let Some(displaced) = state.secondary.take() {
                        state.background.push(displaced);
                    }
                    state.secondary = Some(prev);
                }
                _ => state.background.push(prev),
            }
        }

        // A Return promotes the matching secondary/background entry
        // instead of keeping a stale copy around.
        if transition == FocusTransition::Return {
            if state.secondary.as_ref().is_some_and(|t| t.target_id == target_id) {
                state.secondary = None;
            }
            state.background.retain(|t| t.target_id != target_id);
        }

        state.primary = Some(FocusTarget {
            target_id: target_id.to_string(),
            label: label.to_string(),
            since: Utc::now(),
        });

        let cost_ms = started.elapsed().as_millis() as u64;
        let switch = TaskSwitch::new(
            project_id,
            previous.map(|t| t.target_id),
            target_id,
            transition,
            cost_ms,
            pinned_items,
        );
        info!(
            project_id,
            to = target_id,
            transition = transition.as_str(),
            cost_ms,
            "focus switch"
        );
        Ok(switch)
    }

    /// Demote everything; the project has no focus.
    pub fn clear(&self, project_id: &str) {
        self.states
            .lock()
            .expect("focus state poisoned")
            .remove(project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_switch_sets_primary() {
        let manager = FocusManager::new();
        let switch = manager
            .switch_primary("p1", "g1", "fix the bug", FocusTransition::Voluntary, vec![])
            .unwrap();
        assert!(switch.from_goal.is_none());

        let state = manager.current("p1");
        assert_eq!(state.primary.unwrap().target_id, "g1");
        assert!(state.secondary.is_none());
    }

    #[test]
    fn interruption_preserves_previous_as_secondary() {
        let manager = FocusManager::new();
        manager
            .switch_primary("p1", "g1", "main work", FocusTransition::Voluntary, vec![])
            .unwrap();
        manager
            .switch_primary("p1", "g2", "urgent page", FocusTransition::Interruption, vec![])
            .unwrap();

        let state = manager.current("p1");
        assert_eq!(state.primary.unwrap().target_id, "g2");
        assert_eq!(state.secondary.unwrap().target_id, "g1");
    }

    #[test]
    fn return_restores_without_duplicates() {
        let manager = FocusManager::new();
        manager
            .switch_primary("p1", "g1", "main work", FocusTransition::Voluntary, vec![])
            .unwrap();
        manager
            .switch_primary("p1", "g2", "urgent page", FocusTransition::Interruption, vec![])
            .unwrap();
        let switch = manager
            .switch_primary("p1", "g1", "main work", FocusTransition::Return, vec![])
            .unwrap();
        assert_eq!(switch.from_goal.as_deref(), Some("g2"));

        let state = manager.current("p1");
        assert_eq!(state.primary.unwrap().target_id, "g1");
        // g1 must not linger as secondary after returning to it.
        assert!(state
            .secondary
            .as_ref()
            .map_or(true, |t| t.target_id != "g1"));
        assert!(state.background.iter().all(|t| t.target_id != "g1"));
    }

    #[test]
    fn voluntary_switch_pushes_previous_to_background() {
        let manager = FocusManager::new();
        manager
            .switch_primary("p1", "g1", "one", FocusTransition::Voluntary, vec![])
            .unwrap();
        manager
            .switch_primary("p1", "g2", "two", FocusTransition::Voluntary, vec![])
            .unwrap();

        let state = manager.current("p1");
        assert_eq!(state.background.len(), 1);
        assert_eq!(state.background[0].target_id, "g1");
    }

    #[test]
    fn switch_record_captures_pinned_snapshot() {
        let manager = FocusManager::new();
        let switch = manager
            .switch_primary(
                "p1",
                "g1",
                "work",
                FocusTransition::Automatic,
                vec!["w1".into(), "w2".into()],
            )
            .unwrap();
        assert_eq!(switch.pinned_items, vec!["w1", "w2"]);
    }

    #[test]
    fn projects_are_isolated() {
        let manager = FocusManager::new();
        manager
            .switch_primary("p1", "g1", "one", FocusTransition::Voluntary, vec![])
            .unwrap();
        assert!(manager.current("p2").primary.is_none());
    }
}
