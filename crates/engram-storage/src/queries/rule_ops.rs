//! Rule and approval-request rows.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::models::{
    ApprovalRequest, ApprovalStatus, CandidateChange, Rule, RuleCategory, RuleSeverity,
};

use crate::{datetime_to_ms, ms_to_datetime, to_storage_err};

pub fn insert_rule(conn: &Connection, rule: &Rule) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO rules (
            id, project_id, category, rule_type, severity, condition_text,
            exception_text, enabled, auto_block, can_override, created_at_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            rule.id,
            rule.project_id,
            rule.category.as_str(),
            rule.rule_type,
            rule.severity.as_str(),
            rule.condition,
            rule.exception,
            rule.enabled as i32,
            rule.auto_block as i32,
            rule.can_override as i32,
            datetime_to_ms(rule.created_at),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Enabled rules for a project.
pub fn enabled_rules(conn: &Connection, project_id: &str) -> EngramResult<Vec<Rule>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_RULE} FROM rules WHERE project_id = ?1 AND enabled = 1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![project_id], |row| Ok(row_to_rule(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(out)
}

pub fn set_enabled(conn: &Connection, rule_id: &str, enabled: bool) -> EngramResult<()> {
    conn.execute(
        "UPDATE rules SET enabled = ?2 WHERE id = ?1",
        params![rule_id, enabled as i32],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

// --- Approval requests ---

pub fn insert_approval(conn: &Connection, request: &ApprovalRequest) -> EngramResult<()> {
    let change =
        serde_json::to_string(&request.change).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO approval_requests (
            id, project_id, change, confidence, status, pre_snapshot_id,
            post_snapshot_id, created_at_ms, decided_at_ms, decided_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            request.id,
            request.project_id,
            change,
            request.confidence,
            request.status.as_str(),
            request.pre_snapshot_id,
            request.post_snapshot_id,
            datetime_to_ms(request.created_at),
            request.decided_at.map(datetime_to_ms),
            request.decided_by,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_approval(conn: &Connection, id: &str) -> EngramResult<Option<ApprovalRequest>> {
    let result = conn
        .query_row(
            &format!("{SELECT_APPROVAL} FROM approval_requests WHERE id = ?1"),
            params![id],
            |row| Ok(row_to_approval(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result {
        Some(Ok(r)) => Ok(Some(r)),
        Some(Err(e)) => Err(e),
        None => Ok(None),
    }
}

/// Record a decision on a pending request.
pub fn decide_approval(
    conn: &Connection,
    id: &str,
    status: ApprovalStatus,
    decided_by: &str,
    post_snapshot_id: Option<&str>,
    at_ms: i64,
) -> EngramResult<()> {
    let changed = conn
        .execute(
            "UPDATE approval_requests
             SET status = ?2, decided_by = ?3, decided_at_ms = ?4,
                 post_snapshot_id = COALESCE(?5, post_snapshot_id)
             WHERE id = ?1 AND status = 'pending'",
            params![id, status.as_str(), decided_by, at_ms, post_snapshot_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if changed == 0 {
        return Err(EngramError::NotFound {
            entity: "approval_request",
            id: id.to_string(),
        });
    }
    Ok(())
}

const SELECT_RULE: &str = "SELECT id, project_id, category, rule_type, severity, \
    condition_text, exception_text, enabled, auto_block, can_override, created_at_ms";

fn row_to_rule(row: &rusqlite::Row<'_>) -> EngramResult<Rule> {
    let category_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let severity_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let enabled: i32 = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let auto_block: i32 = row.get(8).map_err(|e| to_storage_err(e.to_string()))?;
    let can_override: i32 = row.get(9).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Rule {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        category: RuleCategory::parse(&category_str)
            .ok_or_else(|| to_storage_err(format!("unknown rule category: {category_str}")))?,
        rule_type: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        severity: RuleSeverity::parse(&severity_str)
            .ok_or_else(|| to_storage_err(format!("unknown severity: {severity_str}")))?,
        condition: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        exception: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        enabled: enabled != 0,
        auto_block: auto_block != 0,
        can_override: can_override != 0,
        created_at: ms_to_datetime(row.get(10).map_err(|e| to_storage_err(e.to_string()))?),
    })
}

const SELECT_APPROVAL: &str = "SELECT id, project_id, change, confidence, status, \
    pre_snapshot_id, post_snapshot_id, created_at_ms, decided_at_ms, decided_by";

fn row_to_approval(row: &rusqlite::Row<'_>) -> EngramResult<ApprovalRequest> {
    let change_json: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let change: CandidateChange =
        serde_json::from_str(&change_json).map_err(|e| to_storage_err(e.to_string()))?;
    let decided_at: Option<i64> = row.get(8).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(ApprovalRequest {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        project_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        change,
        confidence: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        status: ApprovalStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("unknown approval status: {status_str}")))?,
        pre_snapshot_id: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        post_snapshot_id: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        created_at: ms_to_datetime(row.get(7).map_err(|e| to_storage_err(e.to_string()))?),
        decided_at: decided_at.map(ms_to_datetime),
        decided_by: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
