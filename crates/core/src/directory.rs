//! Org-chart lookups over a snapshot of a college's actors.

use crate::domain::actor::{Actor, Role};
use crate::errors::DirectoryError;

/// Resolves approver roles to concrete actors.
///
/// Only approved actors count. A role held by more than one approved actor in
/// the same scope is reported as [`DirectoryError::AmbiguousMatch`]; the
/// directory never picks one.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    actors: Vec<Actor>,
}

impl Directory {
    pub fn new(actors: Vec<Actor>) -> Self {
        Self { actors }
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn resolve(
        &self,
        role: Role,
        college: &str,
        department: Option<&str>,
    ) -> Result<&Actor, DirectoryError> {
        if !role.is_approver() {
            return Err(DirectoryError::NotAnApproverRole(role));
        }

        let department = if role.is_department_scoped() {
            match department.map(str::trim).filter(|name| !name.is_empty()) {
                Some(department) => Some(department),
                None => return Err(DirectoryError::DepartmentRequired { role }),
            }
        } else {
            None
        };

        let mut matches = self.actors.iter().filter(|actor| {
            actor.role == role
                && actor.is_approved()
                && actor.belongs_to_college(college)
                && (department.is_none() || actor.belongs_to_department(department))
        });

        let Some(first) = matches.next() else {
            return Err(DirectoryError::NotFound {
                role,
                college: college.to_string(),
                department: department.map(str::to_string),
            });
        };

        let extra = matches.count();
        if extra > 0 {
            return Err(DirectoryError::AmbiguousMatch {
                role,
                college: college.to_string(),
                department: department.map(str::to_string),
                count: extra + 1,
            });
        }

        Ok(first)
    }
}
