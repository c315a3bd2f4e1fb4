use thiserror::Error;

use crate::approvals::AuthorizationFailure;
use crate::domain::actor::Role;
use crate::domain::request::{Decision, OverallStatus, RequestKind};
use crate::store::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OverallStatus, to: OverallStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("no approved {role} found in {college}{}", scope_suffix(.department))]
    NotFound { role: Role, college: String, department: Option<String> },
    #[error("{count} approved {role} actors match {college}{}", scope_suffix(.department))]
    AmbiguousMatch { role: Role, college: String, department: Option<String>, count: usize },
    #[error("resolving {role} requires a department")]
    DepartmentRequired { role: Role },
    #[error("{0} is not an approver role")]
    NotAnApproverRole(Role),
}

fn scope_suffix(department: &Option<String>) -> String {
    department.as_ref().map(|department| format!(" / {department}")).unwrap_or_default()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    #[error("organization not found: {0}")]
    OrganizationNotFound(#[from] DirectoryError),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthorizationFailure),
    #[error("`{subject}` already decided: {reason}")]
    AlreadyDecided { subject: String, reason: String },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{decision:?} is not a valid decision for a {kind} at the {role} stage")]
    InvalidDecisionForVariant { kind: RequestKind, role: Role, decision: Decision },
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn already_decided(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AlreadyDecided { subject: subject.into(), reason: reason.into() }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate(message) => Self::Duplicate(message),
            StoreError::Conflict(message) | StoreError::Backend(message) => {
                Self::Persistence(message)
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not permitted to perform this action.",
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => "The record was changed by someone else. Reload and retry.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl WorkflowError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<WorkflowError> for InterfaceError {
    fn from(value: WorkflowError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            WorkflowError::ValidationFailed(_)
            | WorkflowError::InvalidDecisionForVariant { .. }
            | WorkflowError::Domain(_) => Self::BadRequest { message, correlation_id },
            WorkflowError::Unauthorized(_) => Self::Forbidden { message, correlation_id },
            WorkflowError::NotFound { .. } => Self::NotFound { message, correlation_id },
            WorkflowError::AlreadyDecided { .. } | WorkflowError::Duplicate(_) => {
                Self::Conflict { message, correlation_id }
            }
            WorkflowError::OrganizationNotFound(_) => {
                Self::BadRequest { message, correlation_id }
            }
            WorkflowError::Persistence(_) => Self::ServiceUnavailable { message, correlation_id },
        }
    }
}
