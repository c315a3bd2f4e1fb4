pub mod chain;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::actor::{Actor, ActorId, Role};
use crate::domain::request::{ApprovalStep, Request};

pub use chain::ChainResolver;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthorizationFailure {
    #[error("actor `{actor_id}` has not been approved")]
    ActorNotApproved { actor_id: ActorId },
    #[error("step requires `{required}` but actor is `{actual}`")]
    RoleMismatch { required: Role, actual: Role },
    #[error("actor college {actor_college:?} does not match request college `{request_college}`")]
    CollegeMismatch { actor_college: Option<String>, request_college: String },
    #[error(
        "actor department {actor_department:?} does not match request department {request_department:?}"
    )]
    DepartmentMismatch { actor_department: Option<String>, request_department: Option<String> },
    #[error("step is assigned to `{assignee}`")]
    NotAssignee { assignee: ActorId },
    #[error("only students may submit requests, actor is `{role}`")]
    SubmitterNotStudent { role: Role },
    #[error("actor `{actor_id}` does not take part in request `{request_id}`")]
    NotParticipant { actor_id: ActorId, request_id: String },
    #[error("actors cannot review their own membership")]
    SelfReview,
    #[error("`{reviewer}` does not review `{applicant}` membership")]
    CannotReview { reviewer: Role, applicant: Role },
    #[error("actor `{actor_id}` is not the principal of `{college}`")]
    NotCollegeOwner { actor_id: ActorId, college: String },
}

/// Checks who may act on a pending approval step.
///
/// The checks never look anything up; callers resolve the actor and request first.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionValidator;

impl DecisionValidator {
    pub fn authorize(
        &self,
        actor: &Actor,
        request: &Request,
        step: &ApprovalStep,
    ) -> Result<(), AuthorizationFailure> {
        if !actor.is_approved() {
            return Err(AuthorizationFailure::ActorNotApproved { actor_id: actor.id.clone() });
        }

        if actor.role != step.required_role {
            return Err(AuthorizationFailure::RoleMismatch {
                required: step.required_role,
                actual: actor.role,
            });
        }

        check_scope(actor, request)?;

        // The assignee was fixed when the chain was resolved.
        if let Some(assignee) = &step.assignee {
            if assignee != &actor.id {
                return Err(AuthorizationFailure::NotAssignee { assignee: assignee.clone() });
            }
        }

        Ok(())
    }

    pub fn authorize_submitter(&self, actor: &Actor) -> Result<(), AuthorizationFailure> {
        if actor.role != Role::Student {
            return Err(AuthorizationFailure::SubmitterNotStudent { role: actor.role });
        }
        if !actor.is_approved() {
            return Err(AuthorizationFailure::ActorNotApproved { actor_id: actor.id.clone() });
        }
        Ok(())
    }

    /// The submitter, or an approved actor whose role appears in the chain and
    /// whose scope covers the request.
    pub fn authorize_participant(
        &self,
        actor: &Actor,
        request: &Request,
    ) -> Result<(), AuthorizationFailure> {
        if actor.id == request.submitter_id {
            return Ok(());
        }

        let not_participant = || AuthorizationFailure::NotParticipant {
            actor_id: actor.id.clone(),
            request_id: request.id.0.clone(),
        };

        if !actor.is_approved() {
            return Err(AuthorizationFailure::ActorNotApproved { actor_id: actor.id.clone() });
        }
        if !request.chain.involves(actor.role) {
            return Err(not_participant());
        }
        check_scope(actor, request)
    }
}

fn check_scope(actor: &Actor, request: &Request) -> Result<(), AuthorizationFailure> {
    if !actor.belongs_to_college(&request.scope.college) {
        return Err(AuthorizationFailure::CollegeMismatch {
            actor_college: actor.college.clone(),
            request_college: request.scope.college.clone(),
        });
    }

    if actor.role == Role::Hod && !actor.belongs_to_department(request.scope.department.as_deref())
    {
        return Err(AuthorizationFailure::DepartmentMismatch {
            actor_department: actor.department.clone(),
            request_department: request.scope.department.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{AuthorizationFailure, DecisionValidator};
    use crate::domain::actor::{AccessStatus, Actor, Role, Scope};
    use crate::domain::request::{
        ApprovalChain, ApprovalStep, ChainStage, LeavePayload, LeaveType, Request, RequestPayload,
    };

    fn member(name: &str, role: Role, department: Option<&str>) -> Actor {
        let mut actor = Actor::new(name, format!("{}@northfield.edu", name.to_lowercase()), role);
        actor.college = Some("Northfield".to_string());
        actor.department = department.map(str::to_string);
        actor.access_status = AccessStatus::Approved;
        actor
    }

    fn leave_request(hod: &Actor, student: &Actor) -> (Request, ApprovalStep) {
        let stage = ChainStage { role: Role::Hod, assignee: Some(hod.id.clone()), optional: false };
        let request = Request::draft(
            student.id.clone(),
            Scope { college: "Northfield".to_string(), department: Some("Physics".to_string()) },
            RequestPayload::Leave(LeavePayload {
                leave_type: LeaveType::Personal,
                subject: "Family event".to_string(),
                reason: None,
                from_date: NaiveDate::from_ymd_opt(2026, 5, 1).expect("date"),
                to_date: NaiveDate::from_ymd_opt(2026, 5, 2).expect("date"),
            }),
            ApprovalChain { stages: vec![stage.clone()] },
        );
        let step = ApprovalStep::pending(0, 0, &stage, Utc::now());
        (request, step)
    }

    #[test]
    fn assigned_hod_of_the_same_department_is_authorized() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);

        assert_eq!(DecisionValidator.authorize(&hod, &request, &step), Ok(()));
    }

    #[test]
    fn vice_principal_cannot_act_on_hod_step() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let vp = member("Bob", Role::VicePrincipal, None);
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);

        assert_eq!(
            DecisionValidator.authorize(&vp, &request, &step),
            Err(AuthorizationFailure::RoleMismatch {
                required: Role::Hod,
                actual: Role::VicePrincipal
            })
        );
    }

    #[test]
    fn hod_of_another_department_is_rejected() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let other = member("Olga", Role::Hod, Some("History"));
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);

        assert!(matches!(
            DecisionValidator.authorize(&other, &request, &step),
            Err(AuthorizationFailure::DepartmentMismatch { .. })
        ));
    }

    #[test]
    fn hod_from_another_college_is_rejected() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let mut outsider = member("Xavier", Role::Hod, Some("Physics"));
        outsider.college = Some("Southgate".to_string());
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);

        assert!(matches!(
            DecisionValidator.authorize(&outsider, &request, &step),
            Err(AuthorizationFailure::CollegeMismatch { .. })
        ));
    }

    #[test]
    fn unapproved_actor_is_rejected_first() {
        let mut hod = member("Alice", Role::Hod, Some("Physics"));
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);
        hod.access_status = AccessStatus::Pending;

        assert!(matches!(
            DecisionValidator.authorize(&hod, &request, &step),
            Err(AuthorizationFailure::ActorNotApproved { .. })
        ));
    }

    #[test]
    fn replacement_hod_cannot_take_over_an_assigned_step() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let replacement = member("Hank", Role::Hod, Some("Physics"));
        let student = member("Sam", Role::Student, Some("Physics"));
        let (request, step) = leave_request(&hod, &student);

        assert_eq!(
            DecisionValidator.authorize(&replacement, &request, &step),
            Err(AuthorizationFailure::NotAssignee { assignee: hod.id.clone() })
        );
    }

    #[test]
    fn only_students_submit() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        assert_eq!(
            DecisionValidator.authorize_submitter(&hod),
            Err(AuthorizationFailure::SubmitterNotStudent { role: Role::Hod })
        );
    }

    #[test]
    fn participants_are_submitter_and_chain_roles_in_scope() {
        let hod = member("Alice", Role::Hod, Some("Physics"));
        let student = member("Sam", Role::Student, Some("Physics"));
        let principal = member("Carol", Role::Principal, None);
        let (request, _) = leave_request(&hod, &student);

        assert_eq!(DecisionValidator.authorize_participant(&student, &request), Ok(()));
        assert_eq!(DecisionValidator.authorize_participant(&hod, &request), Ok(()));
        assert!(matches!(
            DecisionValidator.authorize_participant(&principal, &request),
            Err(AuthorizationFailure::NotParticipant { .. })
        ));
    }
}
