use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::actor::{ActorId, Role};
use crate::domain::request::{Decision, OverallStatus, RequestId, StepDecision};

/// Where a decision sends the request next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStage {
    Stage(Role),
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub position: u32,
    pub role: Role,
    pub assignee: Option<ActorId>,
    pub decision: StepDecision,
}

/// The outcome of one committed state-machine transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub request_id: RequestId,
    pub from: OverallStatus,
    pub to: OverallStatus,
    pub decision: Option<Decision>,
    pub acted_by: Option<ActorId>,
    pub decided_step: Option<StepSummary>,
    pub next_step: Option<StepSummary>,
    pub version: u32,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn is_terminal(&self) -> bool {
        self.to.is_terminal()
    }
}
