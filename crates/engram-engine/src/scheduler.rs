//! Background schedules: periodic consolidation and maintenance per
//! project. The hosting process owns the runtime; these loops run until
//! their handle is aborted.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use engram_core::deadline::Deadline;

use crate::Engine;

/// Spawn the periodic consolidation loop for a project. The interval
/// comes from `consolidation.schedule_ms`; each run gets a deadline of
/// half the interval so a stuck run cannot overlap the next tick.
pub fn spawn_consolidation(engine: Arc<Engine>, project_id: String) -> JoinHandle<()> {
    let every = Duration::from_millis(engine.config().consolidation.schedule_ms);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let engine = engine.clone();
            let project = project_id.clone();
            let deadline = Deadline::after(every / 2);
            let result =
                tokio::task::spawn_blocking(move || engine.consolidate(&project, deadline)).await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(project_id = %project_id, error = %e, "scheduled consolidation failed"),
                Err(e) => warn!(project_id = %project_id, error = %e, "consolidation task panicked"),
            }
        }
    })
}

/// Spawn the maintenance loop: outbox drain, reconciliation, labile and
/// TTL sweeps, link decay, stale-agent handling.
pub fn spawn_maintenance(
    engine: Arc<Engine>,
    project_id: String,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let engine = engine.clone();
            let project = project_id.clone();
            let result = tokio::task::spawn_blocking(move || engine.maintain(&project)).await;
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(project_id = %project_id, error = %e, "maintenance failed"),
                Err(e) => warn!(project_id = %project_id, error = %e, "maintenance task panicked"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn maintenance_loop_ticks_and_aborts_cleanly() {
        let engine = Arc::new(Engine::builder().build().unwrap());
        let handle = spawn_maintenance(engine, "p1".into(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
