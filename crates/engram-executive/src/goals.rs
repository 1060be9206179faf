//! Goal hierarchy: priority inheritance and percolating completion.

use std::sync::Arc;

use tracing::info;

use engram_core::errors::{EngramResult, ExecutiveError};
use engram_core::memory::{Priority, Progress};
use engram_core::models::{Goal, GoalStatus, GoalType};
use engram_storage::queries::goal_ops;
use engram_storage::StorageEngine;

/// Safety bound when climbing parent chains.
const PARENT_CHAIN_LIMIT: usize = 32;

pub struct GoalManager {
    storage: Arc<StorageEngine>,
}

impl GoalManager {
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Create a goal. Children inherit the parent's priority unless an
    /// explicit one is given.
    pub fn create(
        &self,
        project_id: &str,
        text: &str,
        goal_type: GoalType,
        parent_id: Option<&str>,
        priority: Option<Priority>,
    ) -> EngramResult<Goal> {
        let mut goal = Goal::new(project_id, text, goal_type);

        if let Some(parent_id) = parent_id {
            let parent = self
                .storage
                .with_reader(|conn| goal_ops::get_goal(conn, parent_id))?
                .ok_or(engram_core::errors::EngramError::NotFound {
                    entity: "goal",
                    id: parent_id.to_string(),
                })?;
            goal.parent_id = Some(parent.id.clone());
            goal.priority = priority.unwrap_or(parent.priority);
            goal.priority_overridden = priority.is_some();
        } else if let Some(priority) = priority {
            goal.priority = priority;
            goal.priority_overridden = true;
        }

        self.storage.with_writer(|conn| goal_ops::insert_goal(conn, &goal))?;
        Ok(goal)
    }

    pub fn get(&self, goal_id: &str) -> EngramResult<Option<Goal>> {
        self.storage.with_reader(|conn| goal_ops::get_goal(conn, goal_id))
    }

    pub fn list(&self, project_id: &str) -> EngramResult<Vec<Goal>> {
        self.storage
            .with_reader(|conn| goal_ops::list_goals(conn, project_id))
    }

    /// Update progress; reaching 1.0 completes the goal and percolates
    /// upward where all siblings are complete.
    pub fn set_progress(&self, goal_id: &str, progress: Progress) -> EngramResult<()> {
        self.storage
            .with_writer(|conn| goal_ops::set_progress(conn, goal_id, progress))?;
        if progress.is_complete() {
            self.complete(goal_id)?;
        }
        Ok(())
    }

    /// Complete a goal. A parent completes only when every child is
    /// completed; completion then climbs the chain.
    pub fn complete(&self, goal_id: &str) -> EngramResult<()> {
        self.storage.with_writer(|conn| {
            goal_ops::set_status(conn, goal_id, GoalStatus::Completed)?;
            goal_ops::set_progress(conn, goal_id, Progress::new(1.0))
        })?;
        info!(goal_id, "goal completed");

        let mut current = goal_id.to_string();
        for _ in 0..PARENT_CHAIN_LIMIT {
            let goal = self
                .storage
                .with_reader(|conn| goal_ops::get_goal(conn, &current))?
                .ok_or(engram_core::errors::EngramError::NotFound {
                    entity: "goal",
                    id: current.clone(),
                })?;

            let Some(parent_id) = goal.parent_id else {
                return Ok(());
            };

            let children = self
                .storage
                .with_reader(|conn| goal_ops::children_of(conn, &parent_id))?;
            let all_complete = children
                .iter()
                .all(|child| child.status == GoalStatus::Completed);
            if !all_complete {
                return Ok(());
            }

            self.storage.with_writer(|conn| {
                goal_ops::set_status(conn, &parent_id, GoalStatus::Completed)?;
                goal_ops::set_progress(conn, &parent_id, Progress::new(1.0))
            })?;
            info!(goal_id = %parent_id, "parent goal completed by percolation");
            current = parent_id;
        }

        Err(ExecutiveError::GoalCycle {
            goal_id: current,
        }
        .into())
    }

    pub fn set_status(&self, goal_id: &str, status: GoalStatus) -> EngramResult<()> {
        self.storage
            .with_writer(|conn| goal_ops::set_status(conn, goal_id, status))
    }
}
