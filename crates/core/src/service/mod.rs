//! The workflow service: the operations callers drive the approval core through.

pub mod locks;
pub mod notify;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::approvals::{AuthorizationFailure, ChainResolver, DecisionValidator};
use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::config::WorkflowConfig;
use crate::directory::Directory;
use crate::domain::actor::{AccessStatus, Actor, ActorId, Role};
use crate::domain::college::{College, CollegeRegistration, CollegeUpdate};
use crate::domain::message::{EntityRef, Message, MessageKind};
use crate::domain::request::{
    Decision, OverallStatus, Request, RequestId, RequestPayload, RequestStatusView,
};
use crate::errors::{DirectoryError, DomainError, WorkflowError};
use crate::flows::engine::{transition_applied, transition_rejected};
use crate::flows::{FlowTransitionError, RequestStateMachine, TransitionRecord, WorkflowFlow};
use crate::membership::{self, AccessVerdict};
use crate::store::{
    ActorStore, CollegeStore, InMemoryActorStore, InMemoryCollegeStore, InMemoryMessageStore,
    InMemoryRequestStore, MessageStore, RequestStore, StoreError,
};

pub use locks::{KeyedLocks, RequestLocks, SeatLocks};

#[derive(Clone)]
pub struct WorkflowStores {
    pub actors: Arc<dyn ActorStore>,
    pub colleges: Arc<dyn CollegeStore>,
    pub requests: Arc<dyn RequestStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl WorkflowStores {
    pub fn in_memory() -> Self {
        Self {
            actors: Arc::new(InMemoryActorStore::default()),
            colleges: Arc::new(InMemoryCollegeStore::default()),
            requests: Arc::new(InMemoryRequestStore::default()),
            messages: Arc::new(InMemoryMessageStore::default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActor {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCommand {
    pub request_id: RequestId,
    pub actor_id: ActorId,
    pub decision: Decision,
    pub remarks: Option<String>,
    /// Position of the step the caller saw pending; a mismatch means the
    /// decision is stale.
    pub expected_step: Option<u32>,
}

pub struct WorkflowService {
    stores: WorkflowStores,
    audit: Arc<dyn AuditSink>,
    config: WorkflowConfig,
    resolver: ChainResolver,
    validator: DecisionValidator,
    locks: RequestLocks,
    seats: SeatLocks,
}

impl WorkflowService {
    pub fn new(stores: WorkflowStores, audit: Arc<dyn AuditSink>, config: WorkflowConfig) -> Self {
        let resolver = ChainResolver::new(config.certificate_forward_role);
        Self {
            stores,
            audit,
            config,
            resolver,
            validator: DecisionValidator,
            locks: RequestLocks::default(),
            seats: SeatLocks::default(),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn register_actor(&self, new_actor: NewActor) -> Result<Actor, WorkflowError> {
        let name = new_actor.name.trim();
        let email = new_actor.email.trim().to_ascii_lowercase();
        let mut problems = Vec::new();
        if name.is_empty() {
            problems.push("name is required".to_string());
        }
        if !is_plausible_email(&email) {
            problems.push(format!("`{email}` is not a valid email address"));
        }
        if !problems.is_empty() {
            return Err(WorkflowError::ValidationFailed(problems));
        }

        let actor = Actor::new(name, email, new_actor.role);
        self.stores.actors.insert(actor.clone()).await?;

        let audit = self.audit_context(None, &actor.id);
        self.audit.emit(
            audit
                .event("actor.registered", AuditCategory::Directory, AuditOutcome::Success)
                .with_metadata("role", actor.role.as_str()),
        );
        info!(
            event_name = "directory.actor_registered",
            correlation_id = %audit.correlation_id,
            actor_id = %actor.id,
            role = actor.role.as_str(),
            "actor registered"
        );
        Ok(actor)
    }

    pub async fn actor(&self, actor_id: &ActorId) -> Result<Actor, WorkflowError> {
        self.load_actor(actor_id).await
    }

    pub async fn register_college(
        &self,
        principal_id: &ActorId,
        registration: CollegeRegistration,
    ) -> Result<College, WorkflowError> {
        let mut principal = self.load_actor(principal_id).await?;
        if principal.role != Role::Principal {
            return Err(AuthorizationFailure::RoleMismatch {
                required: Role::Principal,
                actual: principal.role,
            }
            .into());
        }
        if let Some(existing) = &principal.college {
            return Err(WorkflowError::Duplicate(format!(
                "principal `{}` already owns `{existing}`",
                principal.id
            )));
        }

        let college = build_college(principal_id, registration)?;
        self.stores.colleges.insert(college.clone()).await?;

        principal.college = Some(college.name.clone());
        principal.department = None;
        principal.access_status = AccessStatus::Approved;
        principal.updated_at = Utc::now();
        self.stores.actors.update(principal).await?;

        let audit = self.audit_context(None, principal_id);
        self.audit.emit(
            audit
                .event("college.registered", AuditCategory::Directory, AuditOutcome::Success)
                .with_metadata("college", college.name.clone())
                .with_metadata("departments", college.departments.join(",")),
        );
        info!(
            event_name = "directory.college_registered",
            correlation_id = %audit.correlation_id,
            college = %college.name,
            principal_id = %principal_id,
            "college registered"
        );
        Ok(college)
    }

    pub async fn colleges(&self) -> Result<Vec<College>, WorkflowError> {
        Ok(self.stores.colleges.list().await?)
    }

    pub async fn college_for_principal(
        &self,
        principal_id: &ActorId,
    ) -> Result<College, WorkflowError> {
        self.stores
            .colleges
            .find_by_principal(principal_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::not_found("college", format!("principal {principal_id}"))
            })
    }

    /// Edits a college's details. Only its principal may do so, and a department
    /// that still has members or open requests cannot be dropped.
    pub async fn update_college(
        &self,
        principal_id: &ActorId,
        college_name: &str,
        update: CollegeUpdate,
    ) -> Result<College, WorkflowError> {
        let principal = self.load_actor(principal_id).await?;
        let current = self
            .stores
            .colleges
            .find(college_name.trim())
            .await?
            .ok_or_else(|| WorkflowError::not_found("college", college_name.trim()))?;
        if current.principal_id != principal.id {
            return Err(AuthorizationFailure::NotCollegeOwner {
                actor_id: principal.id,
                college: current.name,
            }
            .into());
        }

        let mut college = build_college(
            principal_id,
            CollegeRegistration {
                name: current.name.clone(),
                address: update.address,
                city: update.city,
                zip_code: update.zip_code,
                departments: update.departments,
            },
        )?;
        college.created_at = current.created_at;
        for department in &mut college.departments {
            if let Some(existing) = current.canonical_department(department) {
                *department = existing.to_string();
            }
        }

        let dropped: Vec<&String> =
            current.departments.iter().filter(|name| !college.has_department(name)).collect();
        if !dropped.is_empty() {
            let members = self.stores.actors.list_by_college(&current.name).await?;
            let open = self.stores.requests.list_open_in_college(&current.name).await?;
            let mut problems = Vec::new();
            for department in dropped {
                let staffed =
                    members.iter().any(|actor| actor.department.as_ref() == Some(department));
                let pending = open
                    .iter()
                    .any(|request| request.scope.department.as_ref() == Some(department));
                if staffed || pending {
                    problems.push(format!(
                        "department `{department}` still has members or open requests"
                    ));
                }
            }
            if !problems.is_empty() {
                return Err(WorkflowError::ValidationFailed(problems));
            }
        }

        self.stores.colleges.update(college.clone()).await?;

        let audit = self.audit_context(None, principal_id);
        self.audit.emit(
            audit
                .event("college.updated", AuditCategory::Directory, AuditOutcome::Success)
                .with_metadata("college", college.name.clone())
                .with_metadata("departments", college.departments.join(",")),
        );
        info!(
            event_name = "directory.college_updated",
            correlation_id = %audit.correlation_id,
            college = %college.name,
            principal_id = %principal_id,
            "college updated"
        );
        Ok(college)
    }

    pub async fn request_access(
        &self,
        actor_id: &ActorId,
        college_name: &str,
        department: Option<&str>,
    ) -> Result<Actor, WorkflowError> {
        let mut actor = self.load_actor(actor_id).await?;
        if actor.is_approved() {
            return Err(WorkflowError::already_decided(
                actor.id.0.clone(),
                "membership is already approved",
            ));
        }

        let college = self
            .stores
            .colleges
            .find(college_name.trim())
            .await?
            .ok_or_else(|| WorkflowError::not_found("college", college_name.trim()))?;
        let department = membership::check_application(&actor, &college, department)
            .map_err(WorkflowError::ValidationFailed)?;

        actor.college = Some(college.name.clone());
        actor.department = department;
        actor.access_status = AccessStatus::Pending;
        actor.updated_at = Utc::now();
        self.stores.actors.update(actor.clone()).await?;

        self.audit.emit(
            self.audit_context(None, actor_id)
                .event("access.requested", AuditCategory::Membership, AuditOutcome::Success)
                .with_metadata("college", college.name)
                .with_metadata("department", actor.department.clone().unwrap_or_default()),
        );
        Ok(actor)
    }

    pub async fn review_access(
        &self,
        reviewer_id: &ActorId,
        applicant_id: &ActorId,
        verdict: AccessVerdict,
    ) -> Result<Actor, WorkflowError> {
        let reviewer = self.load_actor(reviewer_id).await?;
        let mut applicant = self.load_actor(applicant_id).await?;
        let audit = self.audit_context(None, reviewer_id);

        // Approvals for one seat are serialized from the vacancy check to the update.
        let seat = applicant.seat().filter(|_| verdict == AccessVerdict::Approve);
        let _seat_guard = match &seat {
            Some(seat) => {
                let guard = self.seats.acquire(seat).await;
                applicant = self.load_actor(applicant_id).await?;
                if applicant.seat().as_ref() != Some(seat) {
                    return Err(WorkflowError::already_decided(
                        applicant.id.0.clone(),
                        "membership application changed during review",
                    ));
                }
                Some(guard)
            }
            None => None,
        };

        if applicant.access_status != AccessStatus::Pending || applicant.college.is_none() {
            return Err(WorkflowError::already_decided(
                applicant.id.0.clone(),
                format!("membership is {}", applicant.access_status.as_str()),
            ));
        }

        if let Err(failure) = membership::check_reviewer(&reviewer, &applicant) {
            self.audit.emit(
                audit
                    .event("access.reviewed", AuditCategory::Membership, AuditOutcome::Rejected)
                    .with_metadata("applicant", applicant.id.0.clone())
                    .with_metadata("error", failure.to_string()),
            );
            return Err(failure.into());
        }

        if verdict == AccessVerdict::Approve {
            self.ensure_seat_is_free(&applicant).await?;
        }

        membership::apply_verdict(&mut applicant, verdict, Utc::now());
        self.stores.actors.update(applicant.clone()).await?;

        self.audit.emit(
            audit
                .event("access.reviewed", AuditCategory::Membership, AuditOutcome::Success)
                .with_metadata("applicant", applicant.id.0.clone())
                .with_metadata("verdict", verdict.as_str()),
        );
        info!(
            event_name = "membership.access_reviewed",
            correlation_id = %audit.correlation_id,
            reviewer_id = %reviewer_id,
            applicant_id = %applicant.id,
            verdict = verdict.as_str(),
            "membership reviewed"
        );
        Ok(applicant)
    }

    pub async fn pending_access(&self, reviewer_id: &ActorId) -> Result<Vec<Actor>, WorkflowError> {
        let reviewer = self.load_actor(reviewer_id).await?;
        let Some(college) = reviewer.college.as_deref() else {
            return Ok(Vec::new());
        };

        let members = self.stores.actors.list_by_college(college).await?;
        Ok(members
            .into_iter()
            .filter(|applicant| membership::is_reviewable_by(&reviewer, applicant))
            .collect())
    }

    pub async fn create_request(
        &self,
        submitter_id: &ActorId,
        payload: RequestPayload,
    ) -> Result<RequestId, WorkflowError> {
        let payload = payload.normalized();
        let problems = payload.problems();
        if !problems.is_empty() {
            return Err(WorkflowError::ValidationFailed(problems));
        }

        let submitter = self.load_actor(submitter_id).await?;
        self.validator.authorize_submitter(&submitter)?;
        let scope = match submitter.scope() {
            Some(scope) if scope.department.is_some() => scope,
            _ => {
                return Err(WorkflowError::ValidationFailed(vec![format!(
                    "submitter `{}` has no college and department affiliation",
                    submitter.id
                )]))
            }
        };

        let directory = Directory::new(self.stores.actors.list_by_college(&scope.college).await?);
        let chain = self.resolver.resolve(&payload, &scope, &directory)?;

        let mut request = Request::draft(submitter.id.clone(), scope, payload, chain);
        let machine = RequestStateMachine::new(self.flow_for(&request));
        let record =
            machine.submit(&mut request, Utc::now()).map_err(|error| flow_error(error, &request))?;
        self.stores.requests.insert(request.clone()).await?;

        let audit = self.audit_context(Some(&request.id), submitter_id);
        self.audit.emit(
            audit
                .event("request.created", AuditCategory::Request, AuditOutcome::Success)
                .with_metadata("kind", request.kind().as_str())
                .with_metadata("chain", chain_roles(&request)),
        );
        info!(
            event_name = "workflow.request_created",
            correlation_id = %audit.correlation_id,
            request_id = %request.id,
            kind = request.kind().as_str(),
            submitter_id = %submitter_id,
            "request created"
        );

        self.notify(&request, &record, &audit).await;
        Ok(request.id)
    }

    pub async fn decide(&self, command: DecisionCommand) -> Result<TransitionRecord, WorkflowError> {
        let audit = self.audit_context(Some(&command.request_id), &command.actor_id);
        let guard = self.locks.acquire(&command.request_id).await;

        let mut request = self.load_request(&command.request_id).await?;
        let result = self.apply_decision(&mut request, &command, &audit).await;
        drop(guard);

        let record = match result {
            Ok(record) => record,
            Err(error) => {
                self.audit.emit(
                    audit
                        .event("request.decided", AuditCategory::Decision, AuditOutcome::Rejected)
                        .with_metadata("decision", command.decision.as_str())
                        .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        self.audit.emit(
            audit
                .event("request.decided", AuditCategory::Decision, AuditOutcome::Success)
                .with_metadata("decision", command.decision.as_str())
                .with_metadata("from", record.from.as_str())
                .with_metadata("to", record.to.as_str())
                .with_metadata("version", record.version.to_string()),
        );
        info!(
            event_name = "workflow.request_decided",
            correlation_id = %audit.correlation_id,
            request_id = %request.id,
            actor_id = %command.actor_id,
            decision = command.decision.as_str(),
            status = record.to.as_str(),
            "decision committed"
        );

        self.notify(&request, &record, &audit).await;
        Ok(record)
    }

    pub async fn get_status(
        &self,
        request_id: &RequestId,
    ) -> Result<RequestStatusView, WorkflowError> {
        let request = self.load_request(request_id).await?;
        Ok(RequestStatusView::from(&request))
    }

    /// Open requests whose pending step `actor_id` may decide now.
    pub async fn inbox(&self, actor_id: &ActorId) -> Result<Vec<RequestStatusView>, WorkflowError> {
        let actor = self.load_actor(actor_id).await?;
        let Some(college) = actor.college.as_deref() else {
            return Ok(Vec::new());
        };
        if !actor.role.is_approver() || !actor.is_approved() {
            return Ok(Vec::new());
        }

        let open = self.stores.requests.list_open_in_college(college).await?;
        Ok(open
            .iter()
            .filter(|request| {
                request
                    .current_step()
                    .is_some_and(|step| self.validator.authorize(&actor, request, step).is_ok())
            })
            .map(RequestStatusView::from)
            .collect())
    }

    pub async fn submitted_by(
        &self,
        actor_id: &ActorId,
    ) -> Result<Vec<RequestStatusView>, WorkflowError> {
        self.load_actor(actor_id).await?;
        let requests = self.stores.requests.list_by_submitter(actor_id).await?;
        Ok(requests.iter().map(RequestStatusView::from).collect())
    }

    pub async fn post_message(
        &self,
        request_id: &RequestId,
        sender_id: &ActorId,
        receiver_id: &ActorId,
        text: &str,
    ) -> Result<Message, WorkflowError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(WorkflowError::ValidationFailed(vec![
                "message text must not be empty".to_string()
            ]));
        }
        if sender_id == receiver_id {
            return Err(WorkflowError::ValidationFailed(vec![
                "sender and receiver must differ".to_string()
            ]));
        }

        let request = self.load_request(request_id).await?;
        let sender = self.load_actor(sender_id).await?;
        let receiver = self.load_actor(receiver_id).await?;
        self.validator.authorize_participant(&sender, &request)?;
        self.validator.authorize_participant(&receiver, &request)?;

        let message = Message::new(
            sender.id.clone(),
            receiver.id.clone(),
            text,
            MessageKind::Human,
            Some(EntityRef::request(&request.id, request.kind().as_str())),
        );
        self.stores.messages.append(message.clone()).await?;

        self.audit.emit(
            self.audit_context(Some(request_id), sender_id)
                .event("message.posted", AuditCategory::Request, AuditOutcome::Success)
                .with_metadata("receiver", receiver.id.0.clone()),
        );
        Ok(message)
    }

    /// Messages about a request, oldest first. Only its participants may read them.
    pub async fn messages_for(
        &self,
        request_id: &RequestId,
        viewer_id: &ActorId,
    ) -> Result<Vec<Message>, WorkflowError> {
        let request = self.load_request(request_id).await?;
        let viewer = self.load_actor(viewer_id).await?;
        self.validator.authorize_participant(&viewer, &request)?;
        let mut messages = self.stores.messages.list_for_entity(&request_id.0).await?;
        messages.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(messages)
    }

    async fn apply_decision(
        &self,
        request: &mut Request,
        command: &DecisionCommand,
        audit: &AuditContext,
    ) -> Result<TransitionRecord, WorkflowError> {
        if request.status.is_terminal() {
            return Err(WorkflowError::already_decided(
                request.id.0.clone(),
                format!("request is {}", request.status.as_str()),
            ));
        }

        let current = request.current_step().ok_or_else(|| {
            WorkflowError::Domain(DomainError::InvalidStatusTransition {
                from: request.status,
                to: OverallStatus::InProgress,
            })
        })?;
        if let Some(expected) = command.expected_step {
            if current.position != expected {
                return Err(WorkflowError::already_decided(
                    request.id.0.clone(),
                    format!("step {expected} is no longer pending"),
                ));
            }
        }

        let actor = self.load_actor(&command.actor_id).await?;
        if let Err(failure) = self.validator.authorize(&actor, request, current) {
            if request.has_acted(&actor.id) {
                return Err(WorkflowError::already_decided(
                    request.id.0.clone(),
                    format!("actor `{}` already decided an earlier step", actor.id),
                ));
            }
            return Err(failure.into());
        }

        let expected_version = request.version;
        let machine = RequestStateMachine::new(self.flow_for(request));
        let record = match machine.decide(
            request,
            &actor.id,
            command.decision,
            command.remarks.clone(),
            Utc::now(),
        ) {
            Ok(record) => record,
            Err(error) => {
                self.audit.emit(transition_rejected(command.decision, &error, audit));
                return Err(flow_error(error, request));
            }
        };

        match self.stores.requests.commit(request.clone(), expected_version).await {
            Ok(()) => {
                self.audit.emit(transition_applied(&record, audit));
                Ok(record)
            }
            Err(StoreError::Conflict(reason)) => {
                warn!(
                    event_name = "workflow.decision_conflict",
                    correlation_id = %audit.correlation_id,
                    request_id = %request.id,
                    reason = %reason,
                    "concurrent decision won the commit"
                );
                Err(WorkflowError::already_decided(request.id.0.clone(), reason))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn ensure_seat_is_free(&self, applicant: &Actor) -> Result<(), WorkflowError> {
        if !matches!(applicant.role, Role::Hod | Role::VicePrincipal) {
            return Ok(());
        }
        let Some(college) = applicant.college.as_deref() else {
            return Ok(());
        };

        let directory = Directory::new(self.stores.actors.list_by_college(college).await?);
        match directory.resolve(applicant.role, college, applicant.department.as_deref()) {
            Ok(holder) => {
                let seat = match applicant.department.as_deref() {
                    Some(department) => format!("{college} / {department}"),
                    None => college.to_string(),
                };
                Err(WorkflowError::Duplicate(format!(
                    "{} seat in {seat} is already held by `{}`",
                    applicant.role, holder.id
                )))
            }
            Err(DirectoryError::NotFound { .. }) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn notify(&self, request: &Request, record: &TransitionRecord, audit: &AuditContext) {
        if !self.config.notifications_enabled {
            return;
        }
        let Some(message) = notify::transition_notice(request, record) else {
            return;
        };
        let receiver = message.receiver.clone();

        match self.stores.messages.append(message).await {
            Ok(()) => self.audit.emit(
                audit
                    .event("notification.sent", AuditCategory::Notification, AuditOutcome::Success)
                    .with_metadata("receiver", receiver.0),
            ),
            Err(error) => {
                warn!(
                    event_name = "workflow.notification_failed",
                    correlation_id = %audit.correlation_id,
                    request_id = %request.id,
                    receiver = %receiver,
                    error = %error,
                    "notification dispatch failed"
                );
                self.audit.emit(
                    audit
                        .event(
                            "notification.failed",
                            AuditCategory::Notification,
                            AuditOutcome::Failed,
                        )
                        .with_metadata("receiver", receiver.0)
                        .with_metadata("error", error.to_string()),
                );
            }
        }
    }

    fn flow_for(&self, request: &Request) -> WorkflowFlow {
        WorkflowFlow::for_payload(&request.payload, self.config.certificate_forward_role)
    }

    fn audit_context(&self, request_id: Option<&RequestId>, actor_id: &ActorId) -> AuditContext {
        AuditContext::new(
            request_id.cloned(),
            format!("corr-{}", Uuid::new_v4().simple()),
            actor_id.0.clone(),
        )
    }

    async fn load_actor(&self, actor_id: &ActorId) -> Result<Actor, WorkflowError> {
        self.stores
            .actors
            .find(actor_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("actor", actor_id.0.clone()))
    }

    async fn load_request(&self, request_id: &RequestId) -> Result<Request, WorkflowError> {
        self.stores
            .requests
            .find(request_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("request", request_id.0.clone()))
    }
}

fn flow_error(error: FlowTransitionError, request: &Request) -> WorkflowError {
    match error {
        FlowTransitionError::NotInProgress { status } if status.is_terminal() => {
            WorkflowError::already_decided(
                request.id.0.clone(),
                format!("request is {}", status.as_str()),
            )
        }
        FlowTransitionError::NotInProgress { status }
        | FlowTransitionError::NotDraft { status } => {
            WorkflowError::Domain(DomainError::InvalidStatusTransition {
                from: status,
                to: OverallStatus::InProgress,
            })
        }
        FlowTransitionError::InvalidDecision { kind, role, decision } => {
            WorkflowError::InvalidDecisionForVariant { kind, role, decision }
        }
        FlowTransitionError::StageMissing { role }
        | FlowTransitionError::StageUnassigned { role } => {
            let department =
                request.scope.department.clone().filter(|_| role.is_department_scoped());
            WorkflowError::OrganizationNotFound(DirectoryError::NotFound {
                role,
                college: request.scope.college.clone(),
                department,
            })
        }
        FlowTransitionError::NoPendingStep
        | FlowTransitionError::EmptyChain
        | FlowTransitionError::KindMismatch { .. } => {
            WorkflowError::Domain(DomainError::InvariantViolation(error.to_string()))
        }
        FlowTransitionError::Invariant(error) => WorkflowError::Domain(error),
    }
}

fn build_college(
    principal_id: &ActorId,
    registration: CollegeRegistration,
) -> Result<College, WorkflowError> {
    let mut problems = Vec::new();
    for (field, value) in [
        ("name", &registration.name),
        ("address", &registration.address),
        ("city", &registration.city),
        ("zip_code", &registration.zip_code),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("college {field} is required"));
        }
    }

    let mut departments: Vec<String> = Vec::new();
    for name in registration.departments.iter().map(|name| name.trim()) {
        if name.is_empty() {
            problems.push("department names must not be empty".to_string());
        } else if departments.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
            problems.push(format!("department `{name}` is listed twice"));
        } else {
            departments.push(name.to_string());
        }
    }
    if registration.departments.is_empty() {
        problems.push("at least one department is required".to_string());
    }

    if !problems.is_empty() {
        return Err(WorkflowError::ValidationFailed(problems));
    }

    Ok(College {
        name: registration.name.trim().to_string(),
        address: registration.address.trim().to_string(),
        city: registration.city.trim().to_string(),
        zip_code: registration.zip_code.trim().to_string(),
        principal_id: principal_id.clone(),
        departments,
        created_at: Utc::now(),
    })
}

fn chain_roles(request: &Request) -> String {
    request.chain.stages.iter().map(|stage| stage.role.as_str()).collect::<Vec<_>>().join(">")
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !email.contains(' ')
        }
        None => false,
    }
}
