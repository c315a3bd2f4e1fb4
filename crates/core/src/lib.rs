pub mod approvals;
pub mod audit;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod membership;
pub mod service;
pub mod store;

pub use approvals::{AuthorizationFailure, ChainResolver, DecisionValidator};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use directory::Directory;
pub use domain::actor::{AccessStatus, Actor, ActorId, Role, Scope, Seat};
pub use domain::college::{College, CollegeRegistration, CollegeUpdate};
pub use domain::message::{EntityRef, Message, MessageKind};
pub use domain::request::{
    ApprovalChain, ApprovalStep, CertificatePayload, CustomLetterPayload, Decision, LeavePayload,
    LeaveType, OverallStatus, Request, RequestId, RequestKind, RequestPayload, RequestStatusView,
    StepDecision, StepView,
};
pub use errors::{DirectoryError, DomainError, InterfaceError, WorkflowError};
pub use flows::{RequestStateMachine, TransitionRecord};
pub use membership::AccessVerdict;
pub use service::{DecisionCommand, NewActor, WorkflowService, WorkflowStores};
pub use store::{ActorStore, CollegeStore, MessageStore, RequestStore, StoreError};
