use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome};
use crate::domain::actor::{ActorId, Role};
use crate::domain::request::{
    ApprovalStep, Decision, OverallStatus, Request, RequestKind, RequestPayload, StepDecision,
};
use crate::errors::DomainError;
use crate::flows::states::{NextStage, StepSummary, TransitionRecord};

pub trait RequestFlow {
    fn kind(&self) -> RequestKind;
    fn transition(&self, role: Role, decision: Decision) -> Result<NextStage, FlowTransitionError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LeaveFlow;

impl RequestFlow for LeaveFlow {
    fn kind(&self) -> RequestKind {
        RequestKind::Leave
    }

    fn transition(&self, role: Role, decision: Decision) -> Result<NextStage, FlowTransitionError> {
        route(RequestKind::Leave, role, decision, &RouteTargets::default())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CertificateFlow {
    pub forward_role: Role,
}

impl Default for CertificateFlow {
    fn default() -> Self {
        Self { forward_role: Role::VicePrincipal }
    }
}

impl RequestFlow for CertificateFlow {
    fn kind(&self) -> RequestKind {
        RequestKind::Certificate
    }

    fn transition(&self, role: Role, decision: Decision) -> Result<NextStage, FlowTransitionError> {
        let targets = RouteTargets { forward_role: Some(self.forward_role), to_role: None };
        route(RequestKind::Certificate, role, decision, &targets)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CustomLetterFlow {
    pub to_role: Role,
}

impl RequestFlow for CustomLetterFlow {
    fn kind(&self) -> RequestKind {
        RequestKind::CustomLetter
    }

    fn transition(&self, role: Role, decision: Decision) -> Result<NextStage, FlowTransitionError> {
        let targets = RouteTargets { forward_role: None, to_role: Some(self.to_role) };
        route(RequestKind::CustomLetter, role, decision, &targets)
    }
}

/// The flow matching a stored request's payload.
#[derive(Clone, Copy, Debug)]
pub enum WorkflowFlow {
    Leave(LeaveFlow),
    Certificate(CertificateFlow),
    CustomLetter(CustomLetterFlow),
}

impl WorkflowFlow {
    pub fn for_payload(payload: &RequestPayload, forward_role: Role) -> Self {
        match payload {
            RequestPayload::Leave(_) => Self::Leave(LeaveFlow),
            RequestPayload::Certificate(_) => Self::Certificate(CertificateFlow { forward_role }),
            RequestPayload::CustomLetter(letter) => {
                Self::CustomLetter(CustomLetterFlow { to_role: letter.to_role })
            }
        }
    }
}

impl RequestFlow for WorkflowFlow {
    fn kind(&self) -> RequestKind {
        match self {
            Self::Leave(flow) => flow.kind(),
            Self::Certificate(flow) => flow.kind(),
            Self::CustomLetter(flow) => flow.kind(),
        }
    }

    fn transition(&self, role: Role, decision: Decision) -> Result<NextStage, FlowTransitionError> {
        match self {
            Self::Leave(flow) => flow.transition(role, decision),
            Self::Certificate(flow) => flow.transition(role, decision),
            Self::CustomLetter(flow) => flow.transition(role, decision),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct RouteTargets {
    forward_role: Option<Role>,
    to_role: Option<Role>,
}

/// The single transition table keyed by (kind, pending role, decision).
fn route(
    kind: RequestKind,
    role: Role,
    decision: Decision,
    targets: &RouteTargets,
) -> Result<NextStage, FlowTransitionError> {
    use Decision::{Approved, Forwarded, Rejected};
    use RequestKind::{Certificate, CustomLetter, Leave};

    let next = match (kind, role, decision) {
        (_, _, Rejected) => NextStage::Rejected,
        (Leave, Role::Hod, Approved) => NextStage::Approved,
        (Certificate, Role::Hod, Approved) => NextStage::Stage(Role::Principal),
        (Certificate, Role::Hod, Forwarded) => match targets.forward_role {
            Some(forward_role) => NextStage::Stage(forward_role),
            None => return Err(FlowTransitionError::InvalidDecision { kind, role, decision }),
        },
        (Certificate, Role::Principal, Approved) => NextStage::Approved,
        (Certificate, role, Approved) if Some(role) == targets.forward_role => {
            NextStage::Stage(Role::Principal)
        }
        (CustomLetter, role, Approved) if Some(role) == targets.to_role => NextStage::Approved,
        _ => return Err(FlowTransitionError::InvalidDecision { kind, role, decision }),
    };

    Ok(next)
}

pub struct RequestStateMachine<F> {
    flow: F,
}

impl<F> RequestStateMachine<F>
where
    F: RequestFlow,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn kind(&self) -> RequestKind {
        self.flow.kind()
    }

    /// Opens the first required stage of a draft request.
    pub fn submit(
        &self,
        request: &mut Request,
        now: DateTime<Utc>,
    ) -> Result<TransitionRecord, FlowTransitionError> {
        self.ensure_kind(request)?;
        if request.status != OverallStatus::Draft {
            return Err(FlowTransitionError::NotDraft { status: request.status });
        }

        let (stage_index, stage) =
            request.chain.first_required().ok_or(FlowTransitionError::EmptyChain)?;
        if stage.assignee.is_none() {
            return Err(FlowTransitionError::StageUnassigned { role: stage.role });
        }
        let step = ApprovalStep::pending(0, stage_index as u32, stage, now);
        let next_step = summarize(&step);

        request.steps.push(step);
        request.status = OverallStatus::InProgress;
        request.version += 1;
        request.updated_at = now;
        request.check_invariants()?;

        Ok(TransitionRecord {
            request_id: request.id.clone(),
            from: OverallStatus::Draft,
            to: OverallStatus::InProgress,
            decision: None,
            acted_by: None,
            decided_step: None,
            next_step: Some(next_step),
            version: request.version,
            occurred_at: now,
        })
    }

    /// Applies a decision to the pending step. Authorization is checked by the caller.
    pub fn decide(
        &self,
        request: &mut Request,
        actor_id: &ActorId,
        decision: Decision,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionRecord, FlowTransitionError> {
        self.ensure_kind(request)?;
        if request.status != OverallStatus::InProgress {
            return Err(FlowTransitionError::NotInProgress { status: request.status });
        }

        let current = request.current_step().ok_or(FlowTransitionError::NoPendingStep)?;
        let current_stage = current.stage_index as usize;
        let next = self.flow.transition(current.required_role, decision)?;

        let opened = match next {
            NextStage::Stage(role) => {
                let (index, stage) = request
                    .chain
                    .stage_for(role, current_stage)
                    .ok_or(FlowTransitionError::StageMissing { role })?;
                if stage.assignee.is_none() {
                    return Err(FlowTransitionError::StageUnassigned { role });
                }
                Some((index, stage.clone()))
            }
            NextStage::Approved | NextStage::Rejected => None,
        };

        let from = request.status;
        let position = request.steps.len() as u32;
        let Some(step) = request.steps.last_mut() else {
            return Err(FlowTransitionError::NoPendingStep);
        };
        step.decision = StepDecision::from(decision);
        step.acted_by = Some(actor_id.clone());
        step.remarks = remarks.map(|text| text.trim().to_string()).filter(|text| !text.is_empty());
        step.acted_at = Some(now);
        let decided_step = summarize(step);

        let next_step = match opened {
            Some((index, stage)) => {
                let step = ApprovalStep::pending(position, index as u32, &stage, now);
                let summary = summarize(&step);
                request.steps.push(step);
                Some(summary)
            }
            None => {
                request.status = match next {
                    NextStage::Rejected => OverallStatus::Rejected,
                    _ => OverallStatus::Approved,
                };
                None
            }
        };

        request.version += 1;
        request.updated_at = now;
        request.check_invariants()?;

        Ok(TransitionRecord {
            request_id: request.id.clone(),
            from,
            to: request.status,
            decision: Some(decision),
            acted_by: Some(actor_id.clone()),
            decided_step: Some(decided_step),
            next_step,
            version: request.version,
            occurred_at: now,
        })
    }

    fn ensure_kind(&self, request: &Request) -> Result<(), FlowTransitionError> {
        if request.kind() != self.flow.kind() {
            return Err(FlowTransitionError::KindMismatch {
                expected: self.flow.kind(),
                actual: request.kind(),
            });
        }
        Ok(())
    }
}

/// Audit record of a transition. Emit it only once the transition is stored.
pub fn transition_applied(record: &TransitionRecord, audit: &AuditContext) -> AuditEvent {
    let event = audit
        .event("flow.transition_applied", AuditCategory::Decision, AuditOutcome::Success)
        .with_metadata("from", record.from.as_str())
        .with_metadata("to", record.to.as_str())
        .with_metadata("version", record.version.to_string());
    match record.decision {
        Some(decision) => event.with_metadata("decision", decision.as_str()),
        None => event,
    }
}

pub fn transition_rejected(
    decision: Decision,
    error: &FlowTransitionError,
    audit: &AuditContext,
) -> AuditEvent {
    audit
        .event("flow.transition_rejected", AuditCategory::Decision, AuditOutcome::Rejected)
        .with_metadata("decision", decision.as_str())
        .with_metadata("error", error.to_string())
}

fn summarize(step: &ApprovalStep) -> StepSummary {
    StepSummary {
        position: step.position,
        role: step.required_role,
        assignee: step.assignee.clone(),
        decision: step.decision,
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("request must be a draft to submit, found {status:?}")]
    NotDraft { status: OverallStatus },
    #[error("request is not in progress, found {status:?}")]
    NotInProgress { status: OverallStatus },
    #[error("request has no pending step")]
    NoPendingStep,
    #[error("request has an empty approval chain")]
    EmptyChain,
    #[error("flow for {expected} cannot drive a {actual}")]
    KindMismatch { expected: RequestKind, actual: RequestKind },
    #[error("{decision:?} is not valid for a {kind} at the {role} stage")]
    InvalidDecision { kind: RequestKind, role: Role, decision: Decision },
    #[error("approval chain has no {role} stage after the current one")]
    StageMissing { role: Role },
    #[error("no actor was resolved for the {role} stage")]
    StageUnassigned { role: Role },
    #[error(transparent)]
    Invariant(#[from] DomainError),
}
