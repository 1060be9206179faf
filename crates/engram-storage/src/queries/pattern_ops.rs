//! Pattern rows written during consolidation.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::memory::Confidence;
use engram_core::models::{Pattern, PatternType};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_pattern(conn: &Connection, pattern: &Pattern) -> EngramResult<()> {
    let source_events =
        serde_json::to_string(&pattern.source_events).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO patterns (
            id, run_id, project_id, pattern_type, content, confidence,
            occurrences, source_events, created_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            pattern.id,
            pattern.run_id,
            pattern.project_id,
            pattern.pattern_type.as_str(),
            pattern.content,
            pattern.confidence.value(),
            pattern.occurrences,
            source_events,
            datetime_to_ms(pattern.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn patterns_for_run(conn: &Connection, run_id: &str) -> EngramResult<Vec<Pattern>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, run_id, project_id, pattern_type, content, confidence,
                    occurrences, source_events, created_at_ms
             FROM patterns WHERE run_id = ?1 ORDER BY confidence DESC, id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![run_id], |row| Ok(row_to_pattern(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

fn row_to_pattern(row: &rusqlite::Row<'_>) -> EngramResult<Pattern> {
    let type_str: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    let source_events_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Pattern {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        run_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        pattern_type: PatternType::parse(&type_str)
            .ok_or_else(|| to_storage_err(format!("unknown pattern type: {type_str}")))?,
        content: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        confidence: Confidence::new(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
        occurrences: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        source_events: serde_json::from_str(&source_events_json)
            .map_err(|e| to_storage_err(e.to_string()))?,
        created_at: ms_to_datetime(row.get(8).map_err(|e| to_storage_err(e.to_string()))?),
    })
}
