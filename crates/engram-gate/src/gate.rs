//! The safety gate: confidence-thresholded auto-approval, approval
//! requests referencing pre-change snapshots, and snapshot-based rollback.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use engram_core::errors::{EngramResult, GateError};
use engram_core::models::{
    ApprovalRequest, ApprovalStatus, AuditActor, AuditOperation, CandidateChange, CandidateOutcome,
    ChangeSnapshot, RuleValidation,
};
use engram_storage::audit::AuditLogger;
use engram_storage::queries::{rule_ops, snapshot_ops};
use engram_storage::StorageEngine;

use crate::evaluate::{change_confidence, evaluate_change};

#[derive(Debug, Clone)]
pub struct SafetyGateConfig {
    pub auto_approve_threshold: f64,
    pub auto_reject_threshold: f64,
}

impl Default for SafetyGateConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: 0.8,
            auto_reject_threshold: 0.2,
        }
    }
}

pub struct SafetyGate {
    storage: Arc<StorageEngine>,
    config: SafetyGateConfig,
}

impl SafetyGate {
    pub fn new(storage: Arc<StorageEngine>, config: SafetyGateConfig) -> Self {
        Self { storage, config }
    }

    /// Validate a change against project rules without deciding anything.
    pub fn validate(&self, change: &CandidateChange) -> EngramResult<RuleValidation> {
        let rules = self
            .storage
            .with_reader(|conn| rule_ops::enabled_rules(conn, &change.project_id))?;
        Ok(evaluate_change(change, &rules))
    }

    /// Gate a proposed change.
    ///
    /// High confidence with no auto-blocking violation auto-approves; low
    /// confidence auto-rejects; everything else becomes a pending
    /// approval request referencing a pre-change snapshot.
    pub fn propose(
        &self,
        change: CandidateChange,
        current_state: serde_json::Value,
    ) -> EngramResult<CandidateOutcome> {
        let validation = self.validate(&change)?;
        let confidence = change_confidence(&change);

        let rules = self
            .storage
            .with_reader(|conn| rule_ops::enabled_rules(conn, &change.project_id))?;
        let auto_blocked = validation.violations.iter().any(|violation| {
            rules
                .iter()
                .any(|rule| rule.id == violation.rule_id && rule.auto_block)
        });

        if confidence >= self.config.auto_approve_threshold && !auto_blocked {
            info!(target = %change.target, confidence, "change auto-approved");
            return Ok(CandidateOutcome::AutoApproved);
        }
        if confidence <= self.config.auto_reject_threshold {
            info!(target = %change.target, confidence, "change auto-rejected");
            return Ok(CandidateOutcome::AutoRejected {
                reason: format!("confidence {confidence:.2} below rejection threshold"),
            });
        }

        // Pre-change snapshot first, then the request referencing it.
        let snapshot = ChangeSnapshot::capture(
            change.project_id.clone(),
            change.target.clone(),
            current_state,
        );
        let request = ApprovalRequest {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: change.project_id.clone(),
            change,
            confidence,
            status: ApprovalStatus::Pending,
            pre_snapshot_id: snapshot.id.clone(),
            post_snapshot_id: None,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };

        self.storage.with_writer(|conn| {
            snapshot_ops::insert_snapshot(conn, &snapshot)?;
            rule_ops::insert_approval(conn, &request)?;
            Ok(())
        })?;

        Ok(CandidateOutcome::PendingApproval {
            request_id: request.id,
        })
    }

    /// Approve a pending request. The caller supplies the post-change
    /// state; its snapshot enables rollback. The audit trail records the
    /// decision.
    pub fn approve(
        &self,
        request_id: &str,
        decided_by: &str,
        post_state: serde_json::Value,
    ) -> EngramResult<ApprovalRequest> {
        let request = self.get_request(request_id)?;

        let post_snapshot =
            ChangeSnapshot::capture(request.project_id.clone(), request.change.target.clone(), post_state);
        let now_ms = Utc::now().timestamp_millis();

        self.storage.with_writer(|conn| {
            snapshot_ops::insert_snapshot(conn, &post_snapshot)?;
            rule_ops::decide_approval(
                conn,
                request_id,
                ApprovalStatus::Approved,
                decided_by,
                Some(&post_snapshot.id),
                now_ms,
            )?;
            AuditLogger::log(
                conn,
                "approval_request",
                request_id,
                AuditOperation::Approve,
                AuditActor::User(decided_by.to_string()),
                serde_json::json!({ "target": request.change.target }),
            )?;
            Ok(())
        })?;

        self.get_request(request_id)
    }

    /// Reject a pending request.
    pub fn reject(&self, request_id: &str, decided_by: &str) -> EngramResult<ApprovalRequest> {
        let request = self.get_request(request_id)?;
        let now_ms = Utc::now().timestamp_millis();

        self.storage.with_writer(|conn| {
            rule_ops::decide_approval(
                conn,
                request_id,
                ApprovalStatus::Rejected,
                decided_by,
                None,
                now_ms,
            )?;
            AuditLogger::log(
                conn,
                "approval_request",
                request_id,
                AuditOperation::Reject,
                AuditActor::User(decided_by.to_string()),
                serde_json::json!({ "target": request.change.target }),
            )?;
            Ok(())
        })?;

        self.get_request(request_id)
    }

    /// The pre-change state for an approved request, for rollback.
    pub fn rollback_state(&self, request_id: &str) -> EngramResult<ChangeSnapshot> {
        let request = self.get_request(request_id)?;
        let snapshot = self
            .storage
            .with_reader(|conn| snapshot_ops::get_snapshot(conn, &request.pre_snapshot_id))?
            .ok_or_else(|| GateError::SnapshotMissing {
                request_id: request_id.to_string(),
            })?;

        self.storage.with_writer(|conn| {
            AuditLogger::log(
                conn,
                "approval_request",
                request_id,
                AuditOperation::Rollback,
                AuditActor::System,
                serde_json::json!({ "snapshot": snapshot.id }),
            )
        })?;
        Ok(snapshot)
    }

    fn get_request(&self, request_id: &str) -> EngramResult<ApprovalRequest> {
        self.storage
            .with_reader(|conn| rule_ops::get_approval(conn, request_id))?
            .ok_or_else(|| {
                GateError::RequestNotFound {
                    request_id: request_id.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{Rule, RuleCategory};
    use engram_storage::queries::rule_ops;

    fn gate() -> (SafetyGate, Arc<StorageEngine>) {
        let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
        (
            SafetyGate::new(storage.clone(), SafetyGateConfig::default()),
            storage,
        )
    }

    fn change(change_type: &str, description: &str, evidence: f64) -> CandidateChange {
        CandidateChange {
            project_id: "p1".into(),
            change_type: change_type.into(),
            description: description.into(),
            target: "m1".into(),
            evidence,
            payload: serde_json::json!({"new": "state"}),
        }
    }

    #[test]
    fn confident_clean_change_auto_approves() {
        let (gate, _) = gate();
        let outcome = gate
            .propose(change("memory_update", "reword", 1.0), serde_json::json!({}))
            .unwrap();
        assert_eq!(outcome, CandidateOutcome::AutoApproved);
    }

    #[test]
    fn low_confidence_auto_rejects() {
        let (gate, _) = gate();
        let outcome = gate
            .propose(change("forget", "drop everything", 0.0), serde_json::json!({}))
            .unwrap();
        assert!(matches!(outcome, CandidateOutcome::AutoRejected { .. }));
    }

    #[test]
    fn auto_block_rule_forces_review() {
        let (gate, storage) = gate();
        let mut rule = Rule::new("p1", RuleCategory::Security, "credentials");
        rule.auto_block = true;
        storage
            .with_writer(|conn| rule_ops::insert_rule(conn, &rule))
            .unwrap();

        let outcome = gate
            .propose(
                change("memory_update", "store credentials inline", 1.0),
                serde_json::json!({}),
            )
            .unwrap();
        assert!(matches!(outcome, CandidateOutcome::PendingApproval { .. }));
    }

    #[test]
    fn approval_flow_records_snapshots_and_audit() {
        let (gate, storage) = gate();
        let outcome = gate
            .propose(
                change("rule_update", "midline change", 0.5),
                serde_json::json!({"state": "before"}),
            )
            .unwrap();
        let CandidateOutcome::PendingApproval { request_id } = outcome else {
            panic!("expected pending approval");
        };

        let approved = gate
            .approve(&request_id, "reviewer", serde_json::json!({"state": "after"}))
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert!(approved.post_snapshot_id.is_some());

        // Rollback state is the pre-change snapshot.
        let rollback = gate.rollback_state(&request_id).unwrap();
        assert_eq!(rollback.state, serde_json::json!({"state": "before"}));

        let audit = storage
            .with_reader(|conn| {
                AuditLogger::entries_for(conn, "approval_request", &request_id, 10)
            })
            .unwrap();
        assert!(audit.len() >= 2);
    }

    #[test]
    fn rejection_is_final() {
        let (gate, _) = gate();
        let outcome = gate
            .propose(
                change("rule_update", "midline change", 0.5),
                serde_json::json!({}),
            )
            .unwrap();
        let CandidateOutcome::PendingApproval { request_id } = outcome else {
            panic!("expected pending approval");
        };

        let rejected = gate.reject(&request_id, "reviewer").unwrap();
        assert_eq!(rejected.status, ApprovalStatus::Rejected);
        assert!(gate.approve(&request_id, "reviewer", serde_json::json!({})).is_err());
    }
}
