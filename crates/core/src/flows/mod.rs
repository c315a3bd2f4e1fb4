pub mod engine;
pub mod states;

pub use engine::{
    CertificateFlow, CustomLetterFlow, FlowTransitionError, LeaveFlow, RequestFlow,
    RequestStateMachine, WorkflowFlow,
};
pub use states::{NextStage, StepSummary, TransitionRecord};
