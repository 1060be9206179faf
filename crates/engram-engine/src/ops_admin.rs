//! Consolidation control and maintenance sweeps.

use tracing::info;

use engram_core::deadline::Deadline;
use engram_core::errors::{ConsolidationError, EngramResult};
use engram_core::models::ConsolidationRun;
use engram_storage::queries::run_ops;
use engram_storage::reconcile::SweepReport;

use crate::Engine;

/// Outcome of one maintenance pass.
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    pub dual_write: SweepReport,
    pub labile_closed: usize,
    pub priming_inhibition_expired: usize,
    pub links_decayed: usize,
    pub agents_offline: usize,
    pub tasks_requeued: usize,
}

impl Engine {
    /// Run one consolidation for a project, synchronously. Returns the
    /// finished run record; a concurrent run fails with `AlreadyRunning`.
    pub fn consolidate(&self, project_id: &str, deadline: Deadline) -> EngramResult<ConsolidationRun> {
        let run = self.consolidation.run(project_id, deadline)?;
        self.router.cache().invalidate_for("consolidate");
        Ok(run)
    }

    pub fn run_status(&self, run_id: &str) -> EngramResult<ConsolidationRun> {
        self.storage
            .with_reader(|conn| run_ops::get_run(conn, run_id))?
            .ok_or_else(|| {
                ConsolidationError::RunNotFound {
                    run_id: run_id.to_string(),
                }
                .into()
            })
    }

    pub fn run_history(&self, project_id: &str, limit: usize) -> EngramResult<Vec<ConsolidationRun>> {
        self.storage
            .with_reader(|conn| run_ops::run_history(conn, project_id, limit))
    }

    /// One maintenance pass: drain the outbox and reconcile the stores,
    /// close expired labile windows, expire priming/inhibition, decay
    /// idle links, sweep stale agents.
    pub fn maintain(&self, project_id: &str) -> EngramResult<MaintenanceReport> {
        let mut report = MaintenanceReport {
            labile_closed: self.recon.sweep_expired()?,
            priming_inhibition_expired: self.network.sweep_expired()?,
            links_decayed: self.network.decay_tick()?,
            ..Default::default()
        };

        report.dual_write = self
            .storage
            .with_writer(|conn| self.reconciler.sweep(conn, project_id))?;

        let (offline, requeued) = self.agents.sweep_stale()?;
        report.agents_offline = offline;
        report.tasks_requeued = requeued;

        info!(
            project_id,
            outbox = report.dual_write.outbox_drained,
            labile_closed = report.labile_closed,
            agents_offline = report.agents_offline,
            "maintenance pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::models::EpisodicEvent;
    use engram_storage::queries::event_ops;

    fn engine() -> Engine {
        Engine::builder().build().unwrap()
    }

    #[test]
    fn consolidation_scenario_emits_workflow_pattern() {
        let engine = engine();
        // Ten "deploy" events inside one hour.
        engine
            .storage
            .with_writer(|conn| {
                for i in 0..10 {
                    let mut event = EpisodicEvent::new(
                        "p1",
                        "s1",
                        "command",
                        format!("deploy service revision {i}"),
                    );
                    event.timestamp = Utc::now() - chrono::Duration::minutes(55 - i * 5);
                    event_ops::insert_event(conn, &event)?;
                }
                Ok(())
            })
            .unwrap();

        let run = engine.consolidate("p1", Deadline::none()).unwrap();
        let patterns = engine
            .storage
            .with_reader(|conn| {
                engram_storage::queries::pattern_ops::patterns_for_run(conn, &run.id)
            })
            .unwrap();

        let workflow = patterns
            .iter()
            .find(|p| p.pattern_type == engram_core::models::PatternType::Workflow)
            .expect("workflow pattern emitted");
        assert!(workflow.confidence.value() >= 0.7);
        assert_eq!(workflow.source_events.len(), 10);
    }

    #[test]
    fn run_status_and_history_are_queryable() {
        let engine = engine();
        let run = engine.consolidate("p1", Deadline::none()).unwrap();

        let status = engine.run_status(&run.id).unwrap();
        assert_eq!(status.id, run.id);

        let history = engine.run_history("p1", 10).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn maintenance_pass_runs_clean_on_empty_state() {
        let engine = engine();
        let report = engine.maintain("p1").unwrap();
        assert_eq!(report.dual_write.outbox_drained, 0);
        assert_eq!(report.agents_offline, 0);
    }
}
