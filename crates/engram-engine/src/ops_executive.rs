//! Executive operations: tasks, goals, agents, rule gate.

use engram_core::deadline::Deadline;
use engram_core::errors::EngramResult;
use engram_core::memory::{Priority, Progress};
use engram_core::models::{
    Agent, CandidateChange, CandidateOutcome, Goal, GoalStatus, GoalType, RuleValidation, Task,
    TaskStatus,
};

use crate::Engine;

impl Engine {
    // --- Tasks ---

    pub fn create_task(
        &self,
        project_id: &str,
        content: &str,
        requirements: Vec<String>,
        dependencies: Vec<String>,
        priority: Option<Priority>,
    ) -> EngramResult<Task> {
        self.tasks
            .create(project_id, content, requirements, dependencies, priority)
    }

    /// Ready tasks only: pending with all dependencies completed.
    pub fn poll_tasks(&self, project_id: &str, limit: usize) -> EngramResult<Vec<Task>> {
        self.tasks.poll_ready(project_id, limit)
    }

    pub fn claim_task(
        &self,
        task_id: &str,
        agent_id: &str,
        expected_version: u64,
    ) -> EngramResult<u64> {
        let version = self.tasks.claim(task_id, agent_id, expected_version)?;
        self.agents.set_busy(agent_id, task_id).ok();
        Ok(version)
    }

    pub fn start_task(&self, task_id: &str) -> EngramResult<()> {
        self.tasks.start(task_id)
    }

    pub fn complete_task(
        &self,
        task_id: &str,
        effort_actual_ms: Option<u64>,
    ) -> EngramResult<()> {
        self.tasks.complete(task_id, effort_actual_ms)?;
        if let Some(task) = self.tasks.get(task_id)? {
            if let Some(agent_id) = task.assignee {
                self.agents.set_idle(&agent_id).ok();
            }
        }
        Ok(())
    }

    pub fn fail_task(&self, task_id: &str, retry: bool) -> EngramResult<TaskStatus> {
        self.tasks.fail(task_id, retry)
    }

    // --- Goals ---

    pub fn create_goal(
        &self,
        project_id: &str,
        text: &str,
        goal_type: GoalType,
        parent_id: Option<&str>,
        priority: Option<Priority>,
    ) -> EngramResult<Goal> {
        self.goals
            .create(project_id, text, goal_type, parent_id, priority)
    }

    pub fn goal_progress(&self, goal_id: &str, progress: Progress) -> EngramResult<()> {
        self.goals.set_progress(goal_id, progress)
    }

    pub fn goal_status(&self, goal_id: &str, status: GoalStatus) -> EngramResult<()> {
        self.goals.set_status(goal_id, status)
    }

    pub fn list_goals(&self, project_id: &str) -> EngramResult<Vec<Goal>> {
        self.goals.list(project_id)
    }

    // --- Agents ---

    pub fn register_agent(
        &self,
        agent_id: &str,
        agent_type: &str,
        capabilities: Vec<String>,
    ) -> EngramResult<Agent> {
        self.agents.register(agent_id, agent_type, capabilities)
    }

    pub fn heartbeat(&self, agent_id: &str) -> EngramResult<()> {
        self.agents.heartbeat(agent_id)
    }

    // --- Rule gate ---

    pub fn rule_validate(&self, change: &CandidateChange) -> EngramResult<RuleValidation> {
        self.gate.validate(change)
    }

    pub fn propose_change(
        &self,
        change: CandidateChange,
        current_state: serde_json::Value,
        deadline: Deadline,
    ) -> EngramResult<CandidateOutcome> {
        deadline.check("propose_change")?;
        self.gate.propose(change, current_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::builder().build().unwrap()
    }

    #[test]
    fn task_lifecycle_scenario() {
        let engine = engine();
        let a = engine
            .create_task("p1", "task A", vec![], vec![], None)
            .unwrap();
        let b = engine
            .create_task("p1", "task B", vec![], vec![a.id.clone()], None)
            .unwrap();

        // Only A is ready.
        let ready = engine.poll_tasks("p1", 10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, a.id);

        engine.claim_task(&a.id, "agent-1", 1).unwrap();
        engine.complete_task(&a.id, Some(500)).unwrap();

        let ready = engine.poll_tasks("p1", 10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, b.id);
    }

    #[test]
    fn claiming_marks_the_agent_busy() {
        let engine = engine();
        engine.register_agent("agent-1", "worker", vec![]).unwrap();
        let task = engine
            .create_task("p1", "work", vec![], vec![], None)
            .unwrap();

        engine.claim_task(&task.id, "agent-1", 1).unwrap();
        let agent = engine.agents.get("agent-1").unwrap().unwrap();
        assert_eq!(agent.status, engram_core::models::AgentStatus::Busy);

        engine.complete_task(&task.id, None).unwrap();
        let agent = engine.agents.get("agent-1").unwrap().unwrap();
        assert_eq!(agent.status, engram_core::models::AgentStatus::Idle);
    }
}
