//! Agent registry with heartbeats.
//!
//! Agents heartbeat on an interval; anything silent past the staleness
//! threshold is marked offline and its in-flight tasks go back to the
//! queue with a retry count bump.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use engram_core::config::AgentsConfig;
use engram_core::errors::EngramResult;
use engram_core::models::{Agent, AgentStatus};
use engram_storage::queries::{agent_ops, task_ops};
use engram_storage::StorageEngine;

pub struct AgentRegistry {
    storage: Arc<StorageEngine>,
    config: AgentsConfig,
}

impl AgentRegistry {
    pub fn new(storage: Arc<StorageEngine>, config: AgentsConfig) -> Self {
        Self { storage, config }
    }

    pub fn register(
        &self,
        id: &str,
        agent_type: &str,
        capabilities: Vec<String>,
    ) -> EngramResult<Agent> {
        let agent = Agent::new(id, agent_type, capabilities);
        self.storage
            .with_writer(|conn| agent_ops::upsert_agent(conn, &agent))?;
        info!(agent_id = id, agent_type, "agent registered");
        Ok(agent)
    }

    pub fn heartbeat(&self, agent_id: &str) -> EngramResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        self.storage
            .with_writer(|conn| agent_ops::heartbeat(conn, agent_id, now_ms))
    }

    pub fn get(&self, agent_id: &str) -> EngramResult<Option<Agent>> {
        self.storage
            .with_reader(|conn| agent_ops::get_agent(conn, agent_id))
    }

    pub fn list(&self) -> EngramResult<Vec<Agent>> {
        self.storage.with_reader(agent_ops::list_agents)
    }

    pub fn set_busy(&self, agent_id: &str, task_id: &str) -> EngramResult<()> {
        self.storage.with_writer(|conn| {
            agent_ops::set_status(conn, agent_id, AgentStatus::Busy, Some(task_id))
        })
    }

    pub fn set_idle(&self, agent_id: &str) -> EngramResult<()> {
        self.storage
            .with_writer(|conn| agent_ops::set_status(conn, agent_id, AgentStatus::Idle, None))
    }

    /// Mark stale agents offline and requeue their in-flight tasks.
    /// Returns (agents marked offline, tasks requeued).
    pub fn sweep_stale(&self) -> EngramResult<(usize, usize)> {
        let stale_before =
            Utc::now().timestamp_millis() - self.config.stale_threshold_ms as i64;

        let stale = self
            .storage
            .with_reader(|conn| agent_ops::stale_agents(conn, stale_before))?;

        let mut requeued = 0usize;
        for agent in &stale {
            self.storage.with_writer(|conn| {
                agent_ops::set_status(conn, &agent.id, AgentStatus::Offline, None)?;
                for task in task_ops::tasks_for_agent(conn, &agent.id)? {
                    task_ops::requeue_task(conn, &task.id)?;
                    requeued += 1;
                }
                Ok(())
            })?;
            warn!(agent_id = %agent.id, "agent marked offline after stale heartbeat");
        }
        Ok((stale.len(), requeued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{Task, TaskStatus};
    use engram_storage::queries::task_ops;

    fn registry_with(stale_threshold_ms: u64) -> (AgentRegistry, Arc<StorageEngine>) {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        let config = AgentsConfig {
            stale_threshold_ms,
            ..AgentsConfig::default()
        };
        (AgentRegistry::new(storage.clone(), config), storage)
    }

    #[test]
    fn register_and_heartbeat() {
        let (registry, _) = registry_with(60_000);
        registry.register("a1", "worker", vec!["rust".into()]).unwrap();
        registry.heartbeat("a1").unwrap();
        let agent = registry.get("a1").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
    }

    #[test]
    fn heartbeat_for_unknown_agent_is_not_found() {
        let (registry, _) = registry_with(60_000);
        assert!(registry.heartbeat("ghost").is_err());
    }

    #[test]
    fn stale_sweep_marks_offline_and_requeues_tasks() {
        // Threshold 0: every agent is immediately stale.
        let (registry, storage) = registry_with(0);
        registry.register("a1", "worker", vec![]).unwrap();

        let task = Task::new("p1", "in flight");
        storage
            .with_writer(|conn| {
                task_ops::insert_task(conn, &task)?;
                task_ops::claim_task(conn, &task.id, "a1", 1)?;
                Ok(())
            })
            .unwrap();
        registry.set_busy("a1", &task.id).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let (offline, requeued) = registry.sweep_stale().unwrap();
        assert_eq!(offline, 1);
        assert_eq!(requeued, 1);

        let agent = registry.get("a1").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Offline);

        let task = storage
            .with_reader(|conn| task_ops::get_task(conn, &task.id))
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 1);
        assert!(task.assignee.is_none());
    }

    #[test]
    fn fresh_agents_survive_the_sweep() {
        let (registry, _) = registry_with(60_000);
        registry.register("a1", "worker", vec![]).unwrap();
        let (offline, _) = registry.sweep_stale().unwrap();
        assert_eq!(offline, 0);
    }
}
