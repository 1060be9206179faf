//! Prospective task queue.
//!
//! Pending tasks are polled in priority order, then FIFO, gated on
//! dependency completion. Claims are optimistic: they succeed only when
//! the stored version matches the caller's expectation.

use std::sync::Arc;

use tracing::info;

use engram_core::errors::EngramResult;
use engram_core::memory::Priority;
use engram_core::models::{Task, TaskStatus};
use engram_storage::queries::task_ops;
use engram_storage::StorageEngine;

pub struct TaskManager {
    storage: Arc<StorageEngine>,
    max_retries: u32,
}

impl TaskManager {
    pub fn new(storage: Arc<StorageEngine>, max_retries: u32) -> Self {
        Self {
            storage,
            max_retries,
        }
    }

    pub fn create(
        &self,
        project_id: &str,
        content: &str,
        requirements: Vec<String>,
        dependencies: Vec<String>,
        priority: Option<Priority>,
    ) -> EngramResult<Task> {
        let mut task = Task::new(project_id, content);
        task.requirements = requirements;
        task.dependencies = dependencies;
        if let Some(priority) = priority {
            task.priority = priority;
        }
        self.storage.with_writer(|conn| task_ops::insert_task(conn, &task))?;
        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> EngramResult<Option<Task>> {
        self.storage.with_reader(|conn| task_ops::get_task(conn, task_id))
    }

    /// Ready tasks: pending, dependencies completed.
    pub fn poll_ready(&self, project_id: &str, limit: usize) -> EngramResult<Vec<Task>> {
        self.storage
            .with_reader(|conn| task_ops::poll_ready_tasks(conn, project_id, limit))
    }

    /// Optimistic claim. Returns the new version on success.
    pub fn claim(
        &self,
        task_id: &str,
        agent_id: &str,
        expected_version: u64,
    ) -> EngramResult<u64> {
        let version = self
            .storage
            .with_writer(|conn| task_ops::claim_task(conn, task_id, agent_id, expected_version))?;
        info!(task_id, agent_id, version, "task claimed");
        Ok(version)
    }

    pub fn start(&self, task_id: &str) -> EngramResult<()> {
        self.storage
            .with_writer(|conn| task_ops::transition_task(conn, task_id, TaskStatus::Running, None))
    }

    pub fn complete(&self, task_id: &str, effort_actual_ms: Option<u64>) -> EngramResult<()> {
        self.storage.with_writer(|conn| {
            task_ops::transition_task(conn, task_id, TaskStatus::Completed, effort_actual_ms)
        })
    }

    /// Fail a task. With retries remaining it goes back to pending;
    /// beyond the budget it fails permanently.
    pub fn fail(&self, task_id: &str, retry: bool) -> EngramResult<TaskStatus> {
        if retry {
            let retries = self
                .storage
                .with_writer(|conn| task_ops::requeue_task(conn, task_id))?;
            if retries <= self.max_retries {
                info!(task_id, retries, "task requeued");
                return Ok(TaskStatus::Pending);
            }
        }
        self.storage.with_writer(|conn| {
            task_ops::transition_task(conn, task_id, TaskStatus::Failed, None)
        })?;
        Ok(TaskStatus::Failed)
    }

    pub fn cancel(&self, task_id: &str) -> EngramResult<()> {
        self.storage.with_writer(|conn| {
            task_ops::transition_task(conn, task_id, TaskStatus::Cancelled, None)
        })
    }
}
