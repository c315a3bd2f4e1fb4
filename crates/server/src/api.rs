//! JSON API over the workflow service.
//!
//! Endpoints:
//! - `POST /actors`                        register an actor
//! - `GET  /actors/{id}`                   fetch an actor
//! - `POST /colleges`                      register a college (acting principal)
//! - `GET  /colleges`                      list colleges
//! - `PUT  /colleges/{name}`               edit a college (its principal)
//! - `GET  /colleges/by-principal/{id}`    the college a principal owns
//! - `POST /access/requests`               apply for membership (acting actor)
//! - `GET  /access/pending`                applications the acting actor reviews
//! - `POST /access/{applicant_id}/review`  approve or reject an application
//! - `POST /requests`                      submit a request (acting student)
//! - `GET  /requests?view=inbox|submitted` list requests for the acting actor
//! - `GET  /requests/{id}`                 request status with its step trail
//! - `POST /requests/{id}/decision`        decide the pending step
//! - `GET  /requests/{id}/messages`        messages about a request (participants only)
//! - `POST /requests/{id}/messages`        post a message about a request
//!
//! The acting actor is named by the `x-actor-id` header.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use letterflow_core::{
    AccessVerdict, Actor, ActorId, College, CollegeRegistration, CollegeUpdate, Decision,
    DecisionCommand, InterfaceError, Message, NewActor, RequestId, RequestPayload,
    RequestStatusView, TransitionRecord, WorkflowError, WorkflowService,
};

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct ApiState {
    service: Arc<WorkflowService>,
}

pub fn router(service: Arc<WorkflowService>) -> Router {
    Router::new()
        .route("/actors", post(register_actor))
        .route("/actors/{id}", get(get_actor))
        .route("/colleges", post(register_college).get(list_colleges))
        .route("/colleges/{name}", put(update_college))
        .route("/colleges/by-principal/{principal_id}", get(college_for_principal))
        .route("/access/requests", post(request_access))
        .route("/access/pending", get(pending_access))
        .route("/access/{applicant_id}/review", post(review_access))
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/{id}", get(get_status))
        .route("/requests/{id}/decision", post(decide))
        .route("/requests/{id}/messages", get(list_messages).post(post_message))
        .with_state(ApiState { service })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AccessApplication {
    pub college: String,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccessReview {
    pub verdict: AccessVerdict,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: Decision,
    pub remarks: Option<String>,
    pub expected_step: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub receiver_id: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub view: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedRequest {
    pub request_id: RequestId,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub detail: String,
    pub correlation_id: String,
}

/// Interface error carried to the HTTP edge.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id(),
        })
    }
}

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        Self(error.into_interface(correlation_id()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            InterfaceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            InterfaceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            warn!(
                event_name = "api.request_failed",
                correlation_id = %self.0.correlation_id(),
                error = %self.0,
                "request failed"
            );
        }

        let body = ErrorBody {
            error: code,
            message: self.0.user_message().to_string(),
            detail: self.0.message().to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// The actor named by the `x-actor-id` header.
#[derive(Debug, Clone)]
pub struct ActingActor(pub ActorId);

impl<S> FromRequestParts<S> for ActingActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("missing `{ACTOR_HEADER}` header")))?;
        Ok(Self(ActorId(value.to_string())))
    }
}

fn correlation_id() -> String {
    format!("corr-{}", Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn register_actor(
    State(state): State<ApiState>,
    Json(body): Json<NewActor>,
) -> Result<(StatusCode, Json<Actor>), ApiError> {
    let actor = state.service.register_actor(body).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

async fn get_actor(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<Actor>, ApiError> {
    Ok(Json(state.service.actor(&ActorId(id)).await?))
}

async fn register_college(
    ActingActor(principal): ActingActor,
    State(state): State<ApiState>,
    Json(body): Json<CollegeRegistration>,
) -> Result<(StatusCode, Json<College>), ApiError> {
    let college = state.service.register_college(&principal, body).await?;
    Ok((StatusCode::CREATED, Json(college)))
}

async fn list_colleges(State(state): State<ApiState>) -> Result<Json<Vec<College>>, ApiError> {
    Ok(Json(state.service.colleges().await?))
}

async fn update_college(
    ActingActor(principal): ActingActor,
    Path(name): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<CollegeUpdate>,
) -> Result<Json<College>, ApiError> {
    Ok(Json(state.service.update_college(&principal, &name, body).await?))
}

async fn college_for_principal(
    Path(principal_id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<College>, ApiError> {
    Ok(Json(state.service.college_for_principal(&ActorId(principal_id)).await?))
}

async fn request_access(
    ActingActor(actor): ActingActor,
    State(state): State<ApiState>,
    Json(body): Json<AccessApplication>,
) -> Result<Json<Actor>, ApiError> {
    let actor =
        state.service.request_access(&actor, &body.college, body.department.as_deref()).await?;
    Ok(Json(actor))
}

async fn pending_access(
    ActingActor(reviewer): ActingActor,
    State(state): State<ApiState>,
) -> Result<Json<Vec<Actor>>, ApiError> {
    Ok(Json(state.service.pending_access(&reviewer).await?))
}

async fn review_access(
    ActingActor(reviewer): ActingActor,
    Path(applicant_id): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<AccessReview>,
) -> Result<Json<Actor>, ApiError> {
    let applicant =
        state.service.review_access(&reviewer, &ActorId(applicant_id), body.verdict).await?;
    Ok(Json(applicant))
}

async fn create_request(
    ActingActor(submitter): ActingActor,
    State(state): State<ApiState>,
    Json(payload): Json<RequestPayload>,
) -> Result<(StatusCode, Json<CreatedRequest>), ApiError> {
    let request_id = state.service.create_request(&submitter, payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedRequest { request_id })))
}

async fn list_requests(
    ActingActor(actor): ActingActor,
    Query(query): Query<ListQuery>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<RequestStatusView>>, ApiError> {
    let views = match query.view.as_deref().unwrap_or("inbox") {
        "inbox" => state.service.inbox(&actor).await?,
        "submitted" => state.service.submitted_by(&actor).await?,
        other => {
            return Err(ApiError::bad_request(format!(
                "unknown view `{other}` (expected inbox|submitted)"
            )))
        }
    };
    Ok(Json(views))
}

async fn get_status(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<RequestStatusView>, ApiError> {
    Ok(Json(state.service.get_status(&RequestId(id)).await?))
}

async fn decide(
    ActingActor(actor): ActingActor,
    Path(id): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<TransitionRecord>, ApiError> {
    let record = state
        .service
        .decide(DecisionCommand {
            request_id: RequestId(id),
            actor_id: actor,
            decision: body.decision,
            remarks: body.remarks,
            expected_step: body.expected_step,
        })
        .await?;
    Ok(Json(record))
}

async fn list_messages(
    ActingActor(viewer): ActingActor,
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.service.messages_for(&RequestId(id), &viewer).await?))
}

async fn post_message(
    ActingActor(sender): ActingActor,
    Path(id): Path<String>,
    State(state): State<ApiState>,
    Json(body): Json<MessageBody>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state
        .service
        .post_message(&RequestId(id), &sender, &ActorId(body.receiver_id), &body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
