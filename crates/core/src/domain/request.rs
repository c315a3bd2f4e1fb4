use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::{ActorId, Role, Scope};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("REQ-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Leave,
    Certificate,
    CustomLetter,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave_request",
            Self::Certificate => "certificate_request",
            Self::CustomLetter => "custom_letter_request",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "leave_request" | "leave" => Some(Self::Leave),
            "certificate_request" | "certificate" => Some(Self::Certificate),
            "custom_letter_request" | "custom_letter" => Some(Self::CustomLetter),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Emergency,
    Medical,
    Personal,
    Wedding,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePayload {
    pub leave_type: LeaveType,
    pub subject: String,
    pub reason: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePayload {
    pub certificates: Vec<String>,
    pub purpose: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLetterPayload {
    pub to_role: Role,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPayload {
    Leave(LeavePayload),
    Certificate(CertificatePayload),
    CustomLetter(CustomLetterPayload),
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Leave(_) => RequestKind::Leave,
            Self::Certificate(_) => RequestKind::Certificate,
            Self::CustomLetter(_) => RequestKind::CustomLetter,
        }
    }

    /// Returns the list of problems with the payload; empty means valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        match self {
            Self::Leave(leave) => {
                if leave.subject.trim().is_empty() {
                    problems.push("leave subject is required".to_string());
                }
                if leave.from_date > leave.to_date {
                    problems.push(format!(
                        "leave starts after it ends ({} > {})",
                        leave.from_date, leave.to_date
                    ));
                }
            }
            Self::Certificate(certificate) => {
                if !certificate.certificates.iter().any(|name| !name.trim().is_empty()) {
                    problems.push("at least one certificate is required".to_string());
                }
                if certificate.purpose.trim().is_empty() {
                    problems.push("certificate purpose is required".to_string());
                }
            }
            Self::CustomLetter(letter) => {
                if !letter.to_role.is_approver() {
                    problems.push(format!(
                        "custom letters cannot be addressed to `{}`",
                        letter.to_role
                    ));
                }
                if letter.subject.trim().is_empty() {
                    problems.push("letter subject is required".to_string());
                }
                if letter.body.trim().is_empty() {
                    problems.push("letter body is required".to_string());
                }
            }
        }
        problems
    }

    /// Trims free text and drops blank certificate names.
    pub fn normalized(mut self) -> Self {
        match &mut self {
            Self::Leave(leave) => {
                leave.subject = leave.subject.trim().to_string();
                leave.reason = leave
                    .reason
                    .take()
                    .map(|reason| reason.trim().to_string())
                    .filter(|reason| !reason.is_empty());
            }
            Self::Certificate(certificate) => {
                certificate.certificates = certificate
                    .certificates
                    .iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                certificate.purpose = certificate.purpose.trim().to_string();
            }
            Self::CustomLetter(letter) => {
                letter.subject = letter.subject.trim().to_string();
                letter.body = letter.body.trim().to_string();
            }
        }
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Draft,
    InProgress,
    Approved,
    Rejected,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "in_progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// A decision an approver may issue against the pending step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    Forwarded,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" => Some(Self::Rejected),
            "forwarded" | "forward" => Some(Self::Forwarded),
            _ => None,
        }
    }
}

/// The recorded state of an approval step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDecision {
    Pending,
    Approved,
    Rejected,
    Forwarded,
}

impl StepDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Forwarded => "forwarded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "forwarded" => Some(Self::Forwarded),
            _ => None,
        }
    }
}

impl From<Decision> for StepDecision {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => Self::Approved,
            Decision::Rejected => Self::Rejected,
            Decision::Forwarded => Self::Forwarded,
        }
    }
}

/// One stage of a resolved approval chain.
///
/// Optional stages are only entered through a forward and are skipped on a
/// plain approval. The assignee is the actor the directory resolved when the
/// request was created; optional stages may carry none.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStage {
    pub role: Role,
    pub assignee: Option<ActorId>,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalChain {
    pub stages: Vec<ChainStage>,
}

impl ApprovalChain {
    pub fn required_roles(&self) -> Vec<Role> {
        self.stages.iter().filter(|stage| !stage.optional).map(|stage| stage.role).collect()
    }

    pub fn first_required(&self) -> Option<(usize, &ChainStage)> {
        self.stages.iter().enumerate().find(|(_, stage)| !stage.optional)
    }

    /// Next stage after `after` holding `role`, regardless of whether it is optional.
    pub fn stage_for(&self, role: Role, after: usize) -> Option<(usize, &ChainStage)> {
        self.stages.iter().enumerate().skip(after + 1).find(|(_, stage)| stage.role == role)
    }

    pub fn involves(&self, role: Role) -> bool {
        self.stages.iter().any(|stage| stage.role == role)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub position: u32,
    pub stage_index: u32,
    pub required_role: Role,
    pub assignee: Option<ActorId>,
    pub acted_by: Option<ActorId>,
    pub decision: StepDecision,
    pub remarks: Option<String>,
    pub acted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalStep {
    pub fn pending(
        position: u32,
        stage_index: u32,
        stage: &ChainStage,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            position,
            stage_index,
            required_role: stage.role,
            assignee: stage.assignee.clone(),
            acted_by: None,
            decision: StepDecision::Pending,
            remarks: None,
            acted_at: None,
            created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.decision == StepDecision::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub submitter_id: ActorId,
    pub scope: Scope,
    pub payload: RequestPayload,
    pub chain: ApprovalChain,
    pub status: OverallStatus,
    pub steps: Vec<ApprovalStep>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn draft(
        submitter_id: ActorId,
        scope: Scope,
        payload: RequestPayload,
        chain: ApprovalChain,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::generate(),
            submitter_id,
            scope,
            payload,
            chain,
            status: OverallStatus::Draft,
            steps: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn current_step(&self) -> Option<&ApprovalStep> {
        self.steps.last().filter(|step| step.is_pending())
    }

    pub fn has_acted(&self, actor_id: &ActorId) -> bool {
        self.steps.iter().any(|step| step.acted_by.as_ref() == Some(actor_id))
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let violation = |message: String| {
            Err(DomainError::InvariantViolation(format!("request {}: {message}", self.id)))
        };

        for (index, step) in self.steps.iter().enumerate() {
            if step.position as usize != index {
                return violation(format!("step at index {index} has position {}", step.position));
            }
            if self.chain.stages.get(step.stage_index as usize).map(|stage| stage.role)
                != Some(step.required_role)
            {
                return violation(format!(
                    "step {} does not match chain stage {}",
                    step.position, step.stage_index
                ));
            }
        }

        let pending = self.steps.iter().filter(|step| step.is_pending()).count();
        match self.status {
            OverallStatus::Draft => {
                if !self.steps.is_empty() {
                    return violation("draft request already has approval steps".to_string());
                }
            }
            OverallStatus::InProgress => {
                if pending != 1 || self.current_step().is_none() {
                    return violation(format!(
                        "in-progress request must end with exactly one pending step (found {pending})"
                    ));
                }
            }
            OverallStatus::Approved => {
                if pending != 0 {
                    return violation("approved request still has a pending step".to_string());
                }
                let endorsed = self.steps.iter().all(|step| {
                    matches!(step.decision, StepDecision::Approved | StepDecision::Forwarded)
                });
                let last_approved = self
                    .steps
                    .last()
                    .is_some_and(|step| step.decision == StepDecision::Approved);
                if !endorsed || !last_approved {
                    return violation("approved request has a non-approving step".to_string());
                }
                for (index, stage) in self.chain.stages.iter().enumerate() {
                    let covered = self.steps.iter().any(|step| {
                        step.stage_index as usize == index && step.decision == StepDecision::Approved
                    });
                    let forwarded_through = self.steps.iter().any(|step| {
                        step.stage_index as usize == index
                            && step.decision == StepDecision::Forwarded
                    });
                    if !stage.optional && !covered && !forwarded_through {
                        return violation(format!("required role `{}` never approved", stage.role));
                    }
                }
            }
            OverallStatus::Rejected => {
                let rejected = self
                    .steps
                    .iter()
                    .filter(|step| step.decision == StepDecision::Rejected)
                    .count();
                let last_rejected = self
                    .steps
                    .last()
                    .is_some_and(|step| step.decision == StepDecision::Rejected);
                if pending != 0 || rejected != 1 || !last_rejected {
                    return violation("rejected request must end with its only rejection".to_string());
                }
            }
        }

        Ok(())
    }
}

/// Read model returned by status queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatusView {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub submitter_id: ActorId,
    pub overall_status: OverallStatus,
    pub version: u32,
    pub steps: Vec<StepView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub position: u32,
    pub role: Role,
    pub decision: StepDecision,
    pub assignee: Option<ActorId>,
    pub actor_id: Option<ActorId>,
    pub remarks: Option<String>,
    pub acted_at: Option<DateTime<Utc>>,
}

impl From<&Request> for RequestStatusView {
    fn from(request: &Request) -> Self {
        Self {
            request_id: request.id.clone(),
            kind: request.kind(),
            submitter_id: request.submitter_id.clone(),
            overall_status: request.status,
            version: request.version,
            steps: request
                .steps
                .iter()
                .map(|step| StepView {
                    position: step.position,
                    role: step.required_role,
                    decision: step.decision,
                    assignee: step.assignee.clone(),
                    actor_id: step.acted_by.clone(),
                    remarks: step.remarks.clone(),
                    acted_at: step.acted_at,
                })
                .collect(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
