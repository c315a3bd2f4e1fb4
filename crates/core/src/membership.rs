//! Membership applications and their review hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::approvals::AuthorizationFailure;
use crate::domain::actor::{AccessStatus, Actor, Role};
use crate::domain::college::College;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessVerdict {
    Approve,
    Reject,
}

impl AccessVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Checks an application against the college it targets.
///
/// Returns the department as registered on the college (`None` for
/// college-scoped roles) or the list of problems.
pub fn check_application(
    applicant: &Actor,
    college: &College,
    department: Option<&str>,
) -> Result<Option<String>, Vec<String>> {
    let mut problems = Vec::new();
    let department = department.map(str::trim).filter(|name| !name.is_empty());

    let canonical = match applicant.role {
        Role::Principal => {
            problems.push("principals join by registering their own college".to_string());
            None
        }
        Role::VicePrincipal => None,
        Role::Hod | Role::Student => match department {
            Some(name) => match college.canonical_department(name) {
                Some(registered) => Some(registered.to_string()),
                None => {
                    problems.push(format!(
                        "department `{name}` does not exist in `{}`",
                        college.name
                    ));
                    None
                }
            },
            None => {
                problems.push(format!("a {} must name a department", applicant.role));
                None
            }
        },
    };

    if problems.is_empty() {
        Ok(canonical)
    } else {
        Err(problems)
    }
}

/// Checks that `reviewer` may decide `applicant`'s membership.
pub fn check_reviewer(reviewer: &Actor, applicant: &Actor) -> Result<(), AuthorizationFailure> {
    if reviewer.id == applicant.id {
        return Err(AuthorizationFailure::SelfReview);
    }
    if !reviewer.is_approved() {
        return Err(AuthorizationFailure::ActorNotApproved { actor_id: reviewer.id.clone() });
    }
    if reviewer.role.reviews() != Some(applicant.role) {
        return Err(AuthorizationFailure::CannotReview {
            reviewer: reviewer.role,
            applicant: applicant.role,
        });
    }

    let Some(college) = reviewer.college.as_deref() else {
        return Err(AuthorizationFailure::CollegeMismatch {
            actor_college: None,
            request_college: applicant.college.clone().unwrap_or_default(),
        });
    };
    if !applicant.belongs_to_college(college) {
        return Err(AuthorizationFailure::CollegeMismatch {
            actor_college: reviewer.college.clone(),
            request_college: applicant.college.clone().unwrap_or_default(),
        });
    }

    if reviewer.role == Role::Hod && !reviewer.belongs_to_department(applicant.department.as_deref())
    {
        return Err(AuthorizationFailure::DepartmentMismatch {
            actor_department: reviewer.department.clone(),
            request_department: applicant.department.clone(),
        });
    }

    Ok(())
}

/// Whether `reviewer` would see `applicant` in their pending queue.
pub fn is_reviewable_by(reviewer: &Actor, applicant: &Actor) -> bool {
    applicant.access_status == AccessStatus::Pending && check_reviewer(reviewer, applicant).is_ok()
}

pub fn apply_verdict(applicant: &mut Actor, verdict: AccessVerdict, now: DateTime<Utc>) {
    match verdict {
        AccessVerdict::Approve => applicant.access_status = AccessStatus::Approved,
        AccessVerdict::Reject => {
            applicant.access_status = AccessStatus::Rejected;
            applicant.college = None;
            applicant.department = None;
        }
    }
    applicant.updated_at = now;
}
