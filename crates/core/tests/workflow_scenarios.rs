use std::sync::Arc;

use chrono::NaiveDate;

use letterflow_core::audit::AuditOutcome;
use letterflow_core::config::WorkflowConfig;
use letterflow_core::store::{
    ActorStore, InMemoryActorStore, InMemoryRequestStore, MessageStore, RequestStore, StoreError,
};
use letterflow_core::{
    AccessStatus, AccessVerdict, Actor, ActorId, AuthorizationFailure, CertificatePayload,
    CollegeRegistration, CollegeUpdate, CustomLetterPayload, Decision, DecisionCommand,
    DirectoryError, InMemoryAuditSink, LeavePayload, LeaveType, Message, MessageKind, NewActor,
    OverallStatus, Request, RequestId, RequestPayload, Role, StepDecision, WorkflowError,
    WorkflowService, WorkflowStores,
};

struct Campus {
    service: Arc<WorkflowService>,
    stores: WorkflowStores,
    audit: InMemoryAuditSink,
    carol: ActorId,
    bob: ActorId,
    alice: ActorId,
    sam: ActorId,
}

async fn seed_member(
    stores: &WorkflowStores,
    name: &str,
    role: Role,
    department: Option<&str>,
) -> ActorId {
    let mut actor = Actor::new(name, format!("{}@northfield.edu", name.to_lowercase()), role);
    actor.college = Some("Northfield".to_string());
    actor.department = department.map(str::to_string);
    actor.access_status = AccessStatus::Approved;
    let id = actor.id.clone();
    stores.actors.insert(actor).await.expect("seed actor");
    id
}

async fn campus_with(stores: WorkflowStores, config: WorkflowConfig) -> Campus {
    let audit = InMemoryAuditSink::default();
    let service = Arc::new(WorkflowService::new(stores.clone(), Arc::new(audit.clone()), config));

    let carol = service
        .register_actor(NewActor {
            name: "Carol".to_string(),
            email: "carol@northfield.edu".to_string(),
            role: Role::Principal,
        })
        .await
        .expect("register principal")
        .id;
    service
        .register_college(
            &carol,
            CollegeRegistration {
                name: "Northfield".to_string(),
                address: "1 College Road".to_string(),
                city: "Springfield".to_string(),
                zip_code: "12345".to_string(),
                departments: vec!["Physics".to_string(), "Computer Science".to_string()],
            },
        )
        .await
        .expect("register college");

    let bob = seed_member(&stores, "Bob", Role::VicePrincipal, None).await;
    let alice = seed_member(&stores, "Alice", Role::Hod, Some("Physics")).await;
    let sam = seed_member(&stores, "Sam", Role::Student, Some("Physics")).await;

    Campus { service, stores, audit, carol, bob, alice, sam }
}

async fn campus() -> Campus {
    campus_with(WorkflowStores::in_memory(), WorkflowConfig::default()).await
}

fn leave() -> RequestPayload {
    RequestPayload::Leave(LeavePayload {
        leave_type: LeaveType::Medical,
        subject: "Knee surgery".to_string(),
        reason: Some("Recovery time".to_string()),
        from_date: NaiveDate::from_ymd_opt(2026, 11, 2).expect("date"),
        to_date: NaiveDate::from_ymd_opt(2026, 11, 6).expect("date"),
    })
}

fn certificate() -> RequestPayload {
    RequestPayload::Certificate(CertificatePayload {
        certificates: vec!["Bonafide".to_string(), "Conduct".to_string()],
        purpose: "Scholarship application".to_string(),
    })
}

fn decide(request_id: &RequestId, actor_id: &ActorId, decision: Decision) -> DecisionCommand {
    DecisionCommand {
        request_id: request_id.clone(),
        actor_id: actor_id.clone(),
        decision,
        remarks: None,
        expected_step: None,
    }
}

#[tokio::test]
async fn leave_request_approved_by_department_hod() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");

    let record = campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("hod approves");

    assert_eq!(record.to, OverallStatus::Approved);
    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.overall_status, OverallStatus::Approved);
    assert_eq!(status.steps.len(), 1);
    assert_eq!(status.steps[0].role, Role::Hod);
    assert_eq!(status.steps[0].decision, StepDecision::Approved);
    assert_eq!(status.steps[0].actor_id.as_ref(), Some(&campus.alice));
    assert!(status.steps[0].acted_at.is_some());
}

#[tokio::test]
async fn certificate_forward_path_runs_through_vice_principal() {
    let campus = campus().await;
    let request_id =
        campus.service.create_request(&campus.sam, certificate()).await.expect("create");

    let forwarded = campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Forwarded))
        .await
        .expect("hod forwards");
    assert_eq!(forwarded.to, OverallStatus::InProgress);
    assert_eq!(forwarded.next_step.as_ref().map(|step| step.role), Some(Role::VicePrincipal));

    let endorsed = campus
        .service
        .decide(decide(&request_id, &campus.bob, Decision::Approved))
        .await
        .expect("vp approves");
    assert_eq!(endorsed.next_step.as_ref().map(|step| step.role), Some(Role::Principal));

    campus
        .service
        .decide(decide(&request_id, &campus.carol, Decision::Approved))
        .await
        .expect("principal approves");

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.overall_status, OverallStatus::Approved);
    let roles: Vec<_> = status.steps.iter().map(|step| step.role).collect();
    assert_eq!(roles, vec![Role::Hod, Role::VicePrincipal, Role::Principal]);
    assert!(status
        .steps
        .iter()
        .all(|step| matches!(step.decision, StepDecision::Approved | StepDecision::Forwarded)));
}

#[tokio::test]
async fn certificate_direct_approval_goes_to_principal() {
    let campus = campus().await;
    let request_id =
        campus.service.create_request(&campus.sam, certificate()).await.expect("create");

    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("hod approves");

    let error = campus
        .service
        .decide(decide(&request_id, &campus.bob, Decision::Approved))
        .await
        .expect_err("vp is not on the direct path");
    assert!(matches!(
        error,
        WorkflowError::Unauthorized(AuthorizationFailure::RoleMismatch {
            required: Role::Principal,
            actual: Role::VicePrincipal
        })
    ));

    campus
        .service
        .decide(decide(&request_id, &campus.carol, Decision::Approved))
        .await
        .expect("principal approves");
    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.overall_status, OverallStatus::Approved);
    assert_eq!(status.steps.len(), 2);
}

#[tokio::test]
async fn hod_rejection_terminates_leave_request() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");

    campus
        .service
        .decide(DecisionCommand {
            remarks: Some("Exams that week".to_string()),
            ..decide(&request_id, &campus.alice, Decision::Rejected)
        })
        .await
        .expect("hod rejects");

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.overall_status, OverallStatus::Rejected);
    assert_eq!(status.steps[0].remarks.as_deref(), Some("Exams that week"));

    let error = campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect_err("terminal");
    assert!(matches!(error, WorkflowError::AlreadyDecided { .. }));
    let after = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(after.steps.len(), 1);
    assert_eq!(after.version, status.version);
}

#[tokio::test]
async fn vice_principal_cannot_decide_hod_step() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");
    let before = campus.service.get_status(&request_id).await.expect("status");

    let error = campus
        .service
        .decide(decide(&request_id, &campus.bob, Decision::Approved))
        .await
        .expect_err("wrong role");

    assert!(matches!(error, WorkflowError::Unauthorized(_)));
    let after = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(before, after);
}

#[tokio::test]
async fn missing_hod_blocks_request_creation() {
    let campus = campus().await;
    let cs_student =
        seed_member(&campus.stores, "Chris", Role::Student, Some("Computer Science")).await;

    let error = campus.service.create_request(&cs_student, leave()).await.expect_err("no hod");

    assert!(matches!(
        error,
        WorkflowError::OrganizationNotFound(DirectoryError::NotFound { role: Role::Hod, .. })
    ));
    assert!(campus.service.submitted_by(&cs_student).await.expect("list").is_empty());
}

#[tokio::test]
async fn terminal_requests_reject_every_further_decision() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");
    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("approve");

    for (actor, decision) in [
        (&campus.alice, Decision::Rejected),
        (&campus.bob, Decision::Approved),
        (&campus.carol, Decision::Forwarded),
    ] {
        let error = campus
            .service
            .decide(decide(&request_id, actor, decision))
            .await
            .expect_err("terminal");
        assert!(matches!(error, WorkflowError::AlreadyDecided { .. }));
    }

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.steps.len(), 1);
}

#[tokio::test]
async fn concurrent_double_decide_applies_once() {
    let campus = campus().await;
    let request_id =
        campus.service.create_request(&campus.sam, certificate()).await.expect("create");

    let (first, second) = tokio::join!(
        campus.service.decide(decide(&request_id, &campus.alice, Decision::Approved)),
        campus.service.decide(decide(&request_id, &campus.alice, Decision::Approved)),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(WorkflowError::AlreadyDecided { .. }))));

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.steps.len(), 2);
    assert_eq!(status.steps[1].role, Role::Principal);
    assert_eq!(status.steps[1].decision, StepDecision::Pending);
}

/// Yields after every read so concurrent callers observe the same snapshot.
#[derive(Default)]
struct YieldingRequestStore {
    inner: InMemoryRequestStore,
}

#[async_trait::async_trait]
impl RequestStore for YieldingRequestStore {
    async fn insert(&self, request: Request) -> Result<(), StoreError> {
        self.inner.insert(request).await
    }

    async fn find(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        let found = self.inner.find(id).await;
        tokio::task::yield_now().await;
        found
    }

    async fn commit(&self, request: Request, expected_version: u32) -> Result<(), StoreError> {
        self.inner.commit(request, expected_version).await
    }

    async fn list_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Request>, StoreError> {
        self.inner.list_by_submitter(submitter).await
    }

    async fn list_open_in_college(&self, college: &str) -> Result<Vec<Request>, StoreError> {
        self.inner.list_open_in_college(college).await
    }
}

#[tokio::test]
async fn concurrent_decides_across_services_are_settled_by_version() {
    let mut stores = WorkflowStores::in_memory();
    stores.requests = Arc::new(YieldingRequestStore::default());
    let campus = campus_with(stores, WorkflowConfig::default()).await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");
    let other_audit = InMemoryAuditSink::default();
    let other = WorkflowService::new(
        campus.stores.clone(),
        Arc::new(other_audit.clone()),
        WorkflowConfig::default(),
    );

    let (first, second) = tokio::join!(
        campus.service.decide(decide(&request_id, &campus.alice, Decision::Approved)),
        other.decide(decide(&request_id, &campus.alice, Decision::Rejected)),
    );

    let (winner, loser_audit) = match (&first, &second) {
        (Ok(record), Err(WorkflowError::AlreadyDecided { .. })) => (record, &other_audit),
        (Err(WorkflowError::AlreadyDecided { .. }), Ok(record)) => (record, &campus.audit),
        outcomes => panic!("expected one commit and one stale decision, got {outcomes:?}"),
    };

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.version, 2);
    assert_eq!(status.overall_status, winner.to);
    let decided: Vec<_> =
        status.steps.iter().filter(|step| step.decision != StepDecision::Pending).collect();
    assert_eq!(decided.len(), 1);
    assert_eq!(Some(decided[0].decision), winner.decision.map(StepDecision::from));

    assert!(loser_audit.events_of_type("flow.transition_applied").is_empty());
    let applied = campus.audit.events_of_type("flow.transition_applied").len()
        + other_audit.events_of_type("flow.transition_applied").len();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn stale_expected_step_is_already_decided() {
    let campus = campus().await;
    let request_id =
        campus.service.create_request(&campus.sam, certificate()).await.expect("create");
    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Forwarded))
        .await
        .expect("forward");

    let error = campus
        .service
        .decide(DecisionCommand {
            expected_step: Some(0),
            ..decide(&request_id, &campus.bob, Decision::Approved)
        })
        .await
        .expect_err("stale");
    assert!(matches!(error, WorkflowError::AlreadyDecided { .. }));

    let repeat = campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Forwarded))
        .await
        .expect_err("alice already acted");
    assert!(matches!(repeat, WorkflowError::AlreadyDecided { .. }));
}

#[tokio::test]
async fn leave_cannot_be_forwarded() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");

    let error = campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Forwarded))
        .await
        .expect_err("forward on leave");

    assert!(matches!(
        error,
        WorkflowError::InvalidDecisionForVariant { role: Role::Hod, decision: Decision::Forwarded, .. }
    ));
}

#[tokio::test]
async fn forward_without_vice_principal_fails_with_organization_not_found() {
    let stores = WorkflowStores::in_memory();
    let audit = InMemoryAuditSink::default();
    let service = WorkflowService::new(stores.clone(), Arc::new(audit), WorkflowConfig::default());
    let carol = seed_member(&stores, "Carol", Role::Principal, None).await;
    let alice = seed_member(&stores, "Alice", Role::Hod, Some("Physics")).await;
    let sam = seed_member(&stores, "Sam", Role::Student, Some("Physics")).await;

    let request_id = service.create_request(&sam, certificate()).await.expect("create");
    let error = service
        .decide(decide(&request_id, &alice, Decision::Forwarded))
        .await
        .expect_err("no vp");
    assert!(matches!(
        error,
        WorkflowError::OrganizationNotFound(DirectoryError::NotFound {
            role: Role::VicePrincipal,
            ..
        })
    ));

    service.decide(decide(&request_id, &alice, Decision::Approved)).await.expect("direct");
    service.decide(decide(&request_id, &carol, Decision::Approved)).await.expect("principal");
}

#[tokio::test]
async fn custom_letter_goes_straight_to_named_role() {
    let campus = campus().await;
    let request_id = campus
        .service
        .create_request(
            &campus.sam,
            RequestPayload::CustomLetter(CustomLetterPayload {
                to_role: Role::Principal,
                subject: "Hostel transfer".to_string(),
                body: "I request a transfer to the north hostel.".to_string(),
            }),
        )
        .await
        .expect("create");

    let inbox = campus.service.inbox(&campus.carol).await.expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert!(campus.service.inbox(&campus.alice).await.expect("inbox").is_empty());

    campus
        .service
        .decide(decide(&request_id, &campus.carol, Decision::Approved))
        .await
        .expect("principal approves");
    assert!(campus.service.inbox(&campus.carol).await.expect("inbox").is_empty());
}

#[tokio::test]
async fn invalid_payload_and_non_student_submitters_are_refused() {
    let campus = campus().await;
    let empty = RequestPayload::Certificate(CertificatePayload {
        certificates: Vec::new(),
        purpose: "Visa".to_string(),
    });
    assert!(matches!(
        campus.service.create_request(&campus.sam, empty).await,
        Err(WorkflowError::ValidationFailed(_))
    ));

    assert!(matches!(
        campus.service.create_request(&campus.alice, leave()).await,
        Err(WorkflowError::Unauthorized(AuthorizationFailure::SubmitterNotStudent { .. }))
    ));

    assert!(matches!(
        campus.service.create_request(&ActorId("ACT-ghost".to_string()), leave()).await,
        Err(WorkflowError::NotFound { entity: "actor", .. })
    ));
}

#[tokio::test]
async fn decisions_notify_next_assignee_and_submitter() {
    let campus = campus().await;
    let request_id =
        campus.service.create_request(&campus.sam, certificate()).await.expect("create");
    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("hod");
    campus
        .service
        .decide(decide(&request_id, &campus.carol, Decision::Approved))
        .await
        .expect("principal");

    let messages =
        campus.service.messages_for(&request_id, &campus.sam).await.expect("messages");
    let receivers: Vec<_> = messages.iter().map(|message| message.receiver.clone()).collect();
    assert_eq!(receivers, vec![campus.alice.clone(), campus.carol.clone(), campus.sam.clone()]);
    assert!(messages.iter().all(|message| message.kind == MessageKind::System));
    assert_eq!(messages[2].sender, campus.carol);
}

struct BrokenMessageStore;

#[async_trait::async_trait]
impl MessageStore for BrokenMessageStore {
    async fn append(&self, _message: Message) -> Result<(), StoreError> {
        Err(StoreError::Backend("mailbox offline".to_string()))
    }

    async fn list_for_entity(&self, _entity_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_for_receiver(&self, _receiver: &ActorId) -> Result<Vec<Message>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn notification_failure_never_rolls_back_a_decision() {
    let mut stores = WorkflowStores::in_memory();
    stores.messages = Arc::new(BrokenMessageStore);
    let campus = campus_with(stores, WorkflowConfig::default()).await;

    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");
    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("decision commits");

    let status = campus.service.get_status(&request_id).await.expect("status");
    assert_eq!(status.overall_status, OverallStatus::Approved);
    let failures = campus.audit.events_of_type("notification.failed");
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|event| event.outcome == AuditOutcome::Failed));
}

#[tokio::test]
async fn disabled_notifications_send_nothing() {
    let config = WorkflowConfig { notifications_enabled: false, ..WorkflowConfig::default() };
    let campus = campus_with(WorkflowStores::in_memory(), config).await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");

    assert!(campus
        .service
        .messages_for(&request_id, &campus.sam)
        .await
        .expect("messages")
        .is_empty());
}

#[tokio::test]
async fn participants_can_message_about_a_request() {
    let campus = campus().await;
    let config = WorkflowConfig { notifications_enabled: false, ..WorkflowConfig::default() };
    let quiet = WorkflowService::new(
        campus.stores.clone(),
        Arc::new(InMemoryAuditSink::default()),
        config,
    );
    let request_id = quiet.create_request(&campus.sam, leave()).await.expect("create");

    let message = quiet
        .post_message(&request_id, &campus.sam, &campus.alice, "  Can I submit the certificate later? ")
        .await
        .expect("student writes to hod");
    assert_eq!(message.content, "Can I submit the certificate later?");
    assert_eq!(message.kind, MessageKind::Human);

    let error = quiet
        .post_message(&request_id, &campus.carol, &campus.sam, "Hello")
        .await
        .expect_err("principal is not on a leave chain");
    assert!(matches!(
        error,
        WorkflowError::Unauthorized(AuthorizationFailure::NotParticipant { .. })
    ));

    assert_eq!(quiet.messages_for(&request_id, &campus.alice).await.expect("messages").len(), 1);

    let hidden = quiet
        .messages_for(&request_id, &campus.carol)
        .await
        .expect_err("principal is not on a leave chain");
    assert!(matches!(
        hidden,
        WorkflowError::Unauthorized(AuthorizationFailure::NotParticipant { .. })
    ));
    assert!(matches!(
        quiet.messages_for(&request_id, &ActorId("ACT-ghost".to_string())).await,
        Err(WorkflowError::NotFound { entity: "actor", .. })
    ));
}

#[tokio::test]
async fn membership_review_follows_the_hierarchy() {
    let campus = campus().await;
    let dana = campus
        .service
        .register_actor(NewActor {
            name: "Dana".to_string(),
            email: "Dana@Northfield.edu".to_string(),
            role: Role::Hod,
        })
        .await
        .expect("register");
    assert_eq!(dana.email, "dana@northfield.edu");

    campus
        .service
        .request_access(&dana.id, "Northfield", Some("computer science"))
        .await
        .expect("apply");

    let pending = campus.service.pending_access(&campus.bob).await.expect("pending");
    assert_eq!(pending.iter().map(|actor| actor.id.clone()).collect::<Vec<_>>(), vec![dana.id.clone()]);
    assert!(campus.service.pending_access(&campus.carol).await.expect("pending").is_empty());

    let error = campus
        .service
        .review_access(&campus.carol, &dana.id, AccessVerdict::Approve)
        .await
        .expect_err("principal reviews vice principals only");
    assert!(matches!(error, WorkflowError::Unauthorized(AuthorizationFailure::CannotReview { .. })));

    let approved = campus
        .service
        .review_access(&campus.bob, &dana.id, AccessVerdict::Approve)
        .await
        .expect("vp approves hod");
    assert_eq!(approved.access_status, AccessStatus::Approved);
    assert_eq!(approved.department.as_deref(), Some("Computer Science"));

    let again = campus
        .service
        .review_access(&campus.bob, &dana.id, AccessVerdict::Reject)
        .await
        .expect_err("already approved");
    assert!(matches!(again, WorkflowError::AlreadyDecided { .. }));
}

#[tokio::test]
async fn second_hod_for_a_department_cannot_be_approved() {
    let campus = campus().await;
    let hank = campus
        .service
        .register_actor(NewActor {
            name: "Hank".to_string(),
            email: "hank@northfield.edu".to_string(),
            role: Role::Hod,
        })
        .await
        .expect("register");
    campus.service.request_access(&hank.id, "Northfield", Some("Physics")).await.expect("apply");

    let error = campus
        .service
        .review_access(&campus.bob, &hank.id, AccessVerdict::Approve)
        .await
        .expect_err("physics already has a hod");
    assert!(matches!(error, WorkflowError::Duplicate(_)));

    let rejected = campus
        .service
        .review_access(&campus.bob, &hank.id, AccessVerdict::Reject)
        .await
        .expect("rejection is allowed");
    assert!(rejected.college.is_none());
}

/// Yields after listing a college so concurrent reviews interleave.
#[derive(Default)]
struct YieldingActorStore {
    inner: InMemoryActorStore,
}

#[async_trait::async_trait]
impl ActorStore for YieldingActorStore {
    async fn find(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        self.inner.find(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Actor>, StoreError> {
        self.inner.find_by_email(email).await
    }

    async fn insert(&self, actor: Actor) -> Result<(), StoreError> {
        self.inner.insert(actor).await
    }

    async fn update(&self, actor: Actor) -> Result<(), StoreError> {
        self.inner.update(actor).await
    }

    async fn list_by_college(&self, college: &str) -> Result<Vec<Actor>, StoreError> {
        let members = self.inner.list_by_college(college).await;
        tokio::task::yield_now().await;
        members
    }
}

async fn hod_applicant(campus: &Campus, name: &str, department: &str) -> ActorId {
    let applicant = campus
        .service
        .register_actor(NewActor {
            name: name.to_string(),
            email: format!("{}@northfield.edu", name.to_lowercase()),
            role: Role::Hod,
        })
        .await
        .expect("register");
    campus
        .service
        .request_access(&applicant.id, "Northfield", Some(department))
        .await
        .expect("apply");
    applicant.id
}

#[tokio::test]
async fn concurrent_hod_approvals_fill_the_seat_once() {
    let mut stores = WorkflowStores::in_memory();
    stores.actors = Arc::new(YieldingActorStore::default());
    let campus = campus_with(stores, WorkflowConfig::default()).await;
    let dana = hod_applicant(&campus, "Dana", "Computer Science").await;
    let hank = hod_applicant(&campus, "Hank", "Computer Science").await;

    let (first, second) = tokio::join!(
        campus.service.review_access(&campus.bob, &dana, AccessVerdict::Approve),
        campus.service.review_access(&campus.bob, &hank, AccessVerdict::Approve),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(outcome, Err(WorkflowError::Duplicate(_)))));

    let pending = campus.service.pending_access(&campus.bob).await.expect("pending");
    assert_eq!(pending.len(), 1);

    let chris = seed_member(&campus.stores, "Chris", Role::Student, Some("Computer Science")).await;
    campus.service.create_request(&chris, leave()).await.expect("single hod resolves");
}

#[tokio::test]
async fn duplicate_college_and_email_are_conflicts() {
    let campus = campus().await;
    let error = campus
        .service
        .register_actor(NewActor {
            name: "Carol Again".to_string(),
            email: "carol@northfield.edu".to_string(),
            role: Role::Principal,
        })
        .await
        .expect_err("email taken");
    assert!(matches!(error, WorkflowError::Duplicate(_)));

    let error = campus
        .service
        .register_college(
            &campus.carol,
            CollegeRegistration {
                name: "Southgate".to_string(),
                address: "2 Side St".to_string(),
                city: "Springfield".to_string(),
                zip_code: "12346".to_string(),
                departments: vec!["History".to_string()],
            },
        )
        .await
        .expect_err("carol already owns a college");
    assert!(matches!(error, WorkflowError::Duplicate(_)));
}

fn northfield_update(departments: &[&str]) -> CollegeUpdate {
    CollegeUpdate {
        address: "9 Quad Lane".to_string(),
        city: "Shelbyville".to_string(),
        zip_code: "54321".to_string(),
        departments: departments.iter().map(|name| name.to_string()).collect(),
    }
}

#[tokio::test]
async fn principal_edits_own_college() {
    let campus = campus().await;
    let owned = campus.service.college_for_principal(&campus.carol).await.expect("lookup");
    assert_eq!(owned.name, "Northfield");

    let updated = campus
        .service
        .update_college(
            &campus.carol,
            "Northfield",
            northfield_update(&["physics", "Computer Science", "History"]),
        )
        .await
        .expect("update");
    assert_eq!(updated.address, "9 Quad Lane");
    assert_eq!(updated.departments, vec!["Physics", "Computer Science", "History"]);
    assert_eq!(updated.created_at, owned.created_at);

    let reread = campus.service.college_for_principal(&campus.carol).await.expect("lookup");
    assert_eq!(reread, updated);
    assert_eq!(campus.audit.events_of_type("college.updated").len(), 1);

    let dropped = campus
        .service
        .update_college(&campus.carol, "Northfield", northfield_update(&["Physics", "History"]))
        .await
        .expect("computer science has no members");
    assert!(!dropped.has_department("Computer Science"));
}

#[tokio::test]
async fn college_edits_are_restricted_and_guarded() {
    let campus = campus().await;

    let error = campus
        .service
        .update_college(&campus.bob, "Northfield", northfield_update(&["Physics"]))
        .await
        .expect_err("only the principal edits");
    assert!(matches!(
        error,
        WorkflowError::Unauthorized(AuthorizationFailure::NotCollegeOwner { .. })
    ));

    let error = campus
        .service
        .update_college(&campus.carol, "Northfield", northfield_update(&["Computer Science"]))
        .await
        .expect_err("physics has members");
    assert!(matches!(error, WorkflowError::ValidationFailed(ref problems)
        if problems.iter().any(|problem| problem.contains("Physics"))));

    let error = campus
        .service
        .update_college(&campus.carol, "Southgate", northfield_update(&["Physics"]))
        .await
        .expect_err("unknown college");
    assert!(matches!(error, WorkflowError::NotFound { entity: "college", .. }));

    assert!(matches!(
        campus.service.college_for_principal(&campus.bob).await,
        Err(WorkflowError::NotFound { entity: "college", .. })
    ));
    let unchanged = campus.service.college_for_principal(&campus.carol).await.expect("lookup");
    assert_eq!(unchanged.departments, vec!["Physics", "Computer Science"]);
    assert!(campus.audit.events_of_type("college.updated").is_empty());
}

#[tokio::test]
async fn create_and_decide_are_audited() {
    let campus = campus().await;
    let request_id = campus.service.create_request(&campus.sam, leave()).await.expect("create");
    let _ = campus.service.decide(decide(&request_id, &campus.bob, Decision::Approved)).await;
    campus
        .service
        .decide(decide(&request_id, &campus.alice, Decision::Approved))
        .await
        .expect("approve");

    assert_eq!(campus.audit.events_of_type("request.created").len(), 1);
    let decided = campus.audit.events_of_type("request.decided");
    assert_eq!(decided.len(), 2);
    assert_eq!(decided[0].outcome, AuditOutcome::Rejected);
    assert_eq!(decided[1].outcome, AuditOutcome::Success);
    assert!(decided
        .iter()
        .all(|event| event.request_id.as_ref() == Some(&request_id)));
}
