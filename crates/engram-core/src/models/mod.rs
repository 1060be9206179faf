pub mod agent;
pub mod association;
pub mod audit;
pub mod change;
pub mod entity;
pub mod event;
pub mod focus;
pub mod goal;
pub mod outbox;
pub mod pattern;
pub mod project;
pub mod recall;
pub mod revision;
pub mod rule;
pub mod run;
pub mod salience;
pub mod task;
pub mod working_item;

pub use agent::{Agent, AgentStatus};
pub use association::{
    ActivationState, AssociationLink, Inhibition, InhibitionType, LinkType, MemoryLayer, Priming,
};
pub use audit::{AuditActor, AuditEntry, AuditOperation};
pub use change::{ApprovalRequest, ApprovalStatus, CandidateChange, ChangeSnapshot};
pub use entity::{Entity, Relation, RelationType};
pub use event::{EpisodicEvent, EventContext, EventConsolidationStatus};
pub use focus::{FocusLevel, FocusState, FocusTarget, FocusTransition, TaskSwitch};
pub use goal::{Goal, GoalStatus, GoalType};
pub use outbox::{OutboxEntry, OutboxOp};
pub use pattern::{Pattern, PatternType};
pub use project::Project;
pub use recall::{RecallHit, RecallOptions, Strategy};
pub use revision::UpdateHistoryEntry;
pub use rule::{CandidateOutcome, Rule, RuleCategory, RuleSeverity, RuleValidation, Violation};
pub use run::{ConsolidationRun, RunMetrics, RunStatus};
pub use salience::SalienceScore;
pub use task::{Task, TaskStatus};
pub use working_item::{Component, WorkingItem};
