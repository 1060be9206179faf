//! Consolidation-run rows.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{ConsolidationRun, RunMetrics, RunStatus};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_run(conn: &Connection, run: &ConsolidationRun) -> EngramResult<()> {
    let metrics = serde_json::to_string(&run.metrics).map_err(|e| to_storage_err(e.to_string()))?;
    let failures =
        serde_json::to_string(&run.phase_failures).map_err(|e| to_storage_err(e.to_string()))?;
    let misses =
        serde_json::to_string(&run.metric_misses).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO consolidation_runs (
            id, project_id, started_at_ms, finished_at_ms, status, metrics,
            phase_failures, metric_misses
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            run.id,
            run.project_id,
            datetime_to_ms(run.started_at),
            run.finished_at.map(datetime_to_ms),
            run.status.as_str(),
            metrics,
            failures,
            misses,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn finish_run(conn: &Connection, run: &ConsolidationRun) -> EngramResult<()> {
    let metrics = serde_json::to_string(&run.metrics).map_err(|e| to_storage_err(e.to_string()))?;
    let failures =
        serde_json::to_string(&run.phase_failures).map_err(|e| to_storage_err(e.to_string()))?;
    let misses =
        serde_json::to_string(&run.metric_misses).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "UPDATE consolidation_runs
         SET finished_at_ms = ?2, status = ?3, metrics = ?4, phase_failures = ?5,
             metric_misses = ?6
         WHERE id = ?1",
        params![
            run.id,
            run.finished_at.map(datetime_to_ms),
            run.status.as_str(),
            metrics,
            failures,
            misses,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_run(conn: &Connection, id: &str) -> EngramResult<Option<ConsolidationRun>> {
    let result = conn
        .query_row(
            &format!("{SELECT_RUN} FROM consolidation_runs WHERE id = ?1"),
            params![id],
            |row| Ok(row_to_run(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(run)) => Ok(Some(run)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Run history for a project, newest first.
pub fn run_history(
    conn: &Connection,
    project_id: &str,
    limit: usize,
) -> EngramResult<Vec<ConsolidationRun>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_RUN} FROM consolidation_runs
             WHERE project_id = ?1 ORDER BY started_at_ms DESC LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id, limit], |row| Ok(row_to_run(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

const SELECT_RUN: &str = "SELECT id, project_id, started_at_ms, finished_at_ms, status, \
    metrics, phase_failures, metric_misses";

fn row_to_run(row: &rusqlite::Row<'_>) -> EngramResult<ConsolidationRun> {
    let status_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let metrics_json: String = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let failures_json: String = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;
    let misses_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let finished: Option<i64> = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;

    let metrics: RunMetrics =
        serde_json::from_str(&metrics_json).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(ConsolidationRun {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        started_at: ms_to_datetime(row.get(2).map_err(|e| to_storage_err(e.to_string()))?),
        finished_at: finished.map(ms_to_datetime),
        status: RunStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("unknown run status: {status_str}")))?,
        metrics,
        phase_failures: serde_json::from_str(&failures_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        metric_misses: serde_json::from_str(&misses_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
    })
}
