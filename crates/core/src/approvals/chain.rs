use tracing::debug;

use crate::directory::Directory;
use crate::domain::actor::{Role, Scope};
use crate::domain::request::{ApprovalChain, ChainStage, RequestPayload};
use crate::errors::DirectoryError;

/// Computes the approval chain for a request from the submitter's scope.
#[derive(Clone, Copy, Debug)]
pub struct ChainResolver {
    forward_role: Role,
}

impl Default for ChainResolver {
    fn default() -> Self {
        Self { forward_role: Role::VicePrincipal }
    }
}

impl ChainResolver {
    pub fn new(forward_role: Role) -> Self {
        Self { forward_role }
    }

    pub fn forward_role(&self) -> Role {
        self.forward_role
    }

    /// Resolves every stage against the directory.
    ///
    /// Any required role that cannot be resolved fails the whole chain. The
    /// optional forward stage keeps an empty assignee instead.
    pub fn resolve(
        &self,
        payload: &RequestPayload,
        scope: &Scope,
        directory: &Directory,
    ) -> Result<ApprovalChain, DirectoryError> {
        let roles: Vec<(Role, bool)> = match payload {
            RequestPayload::Leave(_) => vec![(Role::Hod, false)],
            RequestPayload::Certificate(_) => {
                vec![(Role::Hod, false), (self.forward_role, true), (Role::Principal, false)]
            }
            RequestPayload::CustomLetter(letter) => vec![(letter.to_role, false)],
        };

        let mut stages = Vec::with_capacity(roles.len());
        for (role, optional) in roles {
            let resolved = directory
                .resolve(role, &scope.college, scope.department.as_deref())
                .map(|actor| actor.id.clone());
            let assignee = match resolved {
                Ok(actor_id) => Some(actor_id),
                Err(error) if optional => {
                    debug!(
                        event_name = "chain.optional_stage_unresolved",
                        role = role.as_str(),
                        college = %scope.college,
                        error = %error,
                        "optional stage left unassigned"
                    );
                    None
                }
                Err(error) => return Err(error),
            };
            stages.push(ChainStage { role, assignee, optional });
        }

        Ok(ApprovalChain { stages })
    }
}
