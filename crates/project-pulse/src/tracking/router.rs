use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequest, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CheckInSubmission, FeedbackSubmission, NewProject, NewUser, ProjectId, ProjectUpdate, RiskId,
    RiskReport, RiskStatus, RiskUpdate, Role,
};
use super::repository::{ActivityLog, TrackingRepository};
use super::service::{ProjectTrackingService, TrackingError};
use crate::auth::{Caller, TokenService};
use crate::health::HealthInputs;

/// Router state: the service plus the token verifier the `Caller` extractor needs.
pub struct TrackingState<R, L> {
    pub service: Arc<ProjectTrackingService<R, L>>,
    pub tokens: Arc<TokenService>,
}

impl<R, L> Clone for TrackingState<R, L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<R, L> FromRef<TrackingState<R, L>> for Arc<TokenService> {
    fn from_ref(state: &TrackingState<R, L>) -> Self {
        Arc::clone(&state.tokens)
    }
}

/// Router builder exposing the authenticated project tracking API.
pub fn tracking_router<R, L>(service: Arc<ProjectTrackingService<R, L>>) -> Router
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let state = TrackingState {
        tokens: service.tokens(),
        service,
    };

    Router::new()
        .route("/api/auth/login", post(login_handler::<R, L>))
        .route("/api/auth/me", get(me_handler::<R, L>))
        .route("/api/auth/logout", post(logout_handler::<R, L>))
        .route(
            "/api/users",
            get(list_users_handler::<R, L>).post(create_user_handler::<R, L>),
        )
        .route(
            "/api/projects",
            get(list_projects_handler::<R, L>).post(create_project_handler::<R, L>),
        )
        .route(
            "/api/projects/:project_id",
            get(project_handler::<R, L>)
                .put(update_project_handler::<R, L>)
                .delete(delete_project_handler::<R, L>),
        )
        .route(
            "/api/checkins",
            get(list_check_ins_handler::<R, L>).post(submit_check_in_handler::<R, L>),
        )
        .route(
            "/api/feedback",
            get(list_feedback_handler::<R, L>).post(submit_feedback_handler::<R, L>),
        )
        .route(
            "/api/risks",
            get(list_risks_handler::<R, L>).post(report_risk_handler::<R, L>),
        )
        .route("/api/risks/:risk_id", put(update_risk_handler::<R, L>))
        .route("/api/activities", get(activity_handler::<R, L>))
        .route("/api/portfolio", get(portfolio_handler::<R, L>))
        .route("/api/health/score", post(score_handler::<R, L>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    project_id: Option<String>,
    role: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(flatten)]
    inputs: HealthInputs,
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

/// `Json` whose rejections answer 400 with the usual `{"error": ..}` body.
pub(crate) struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(bad_request(rejection.body_text())),
        }
    }
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, TrackingError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn parse_id<T: FromStr>(raw: &str, label: &str) -> Result<T, Response> {
    raw.parse()
        .map_err(|_| bad_request(format!("invalid {label} id: {raw}")))
}

fn parse_label<T: DeserializeOwned>(
    raw: Option<&String>,
    field: &str,
) -> Result<Option<T>, Response> {
    raw.map(|value| {
        serde_json::from_value(serde_json::Value::String(value.clone()))
            .map_err(|_| bad_request(format!("invalid {field}: {value}")))
    })
    .transpose()
}

fn project_filter(query: &ListQuery) -> Result<Option<ProjectId>, Response> {
    query
        .project_id
        .as_deref()
        .map(|raw| parse_id(raw, "project"))
        .transpose()
}

pub(crate) async fn login_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match state.service.login(&request.email, &request.password) {
        Ok(outcome) => {
            let cookie = state.tokens.session_cookie(&outcome.token);
            (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(outcome)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn me_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(StatusCode::OK, state.service.current_user(&caller))
}

pub(crate) async fn logout_handler<R, L>(State(state): State<TrackingState<R, L>>) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let cookie = state.tokens.expired_cookie();
    let payload = json!({ "message": "Logged out" });
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(payload)).into_response()
}

pub(crate) async fn list_users_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let role = match parse_label::<Role>(query.role.as_ref(), "role") {
        Ok(role) => role,
        Err(response) => return response,
    };
    respond(StatusCode::OK, state.service.list_users(&caller, role))
}

pub(crate) async fn create_user_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    JsonBody(new_user): JsonBody<NewUser>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(
        StatusCode::CREATED,
        state.service.create_user(&caller, new_user),
    )
}

pub(crate) async fn list_projects_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(StatusCode::OK, state.service.list_projects(&caller))
}

pub(crate) async fn create_project_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    JsonBody(project): JsonBody<NewProject>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(
        StatusCode::CREATED,
        state.service.create_project(&caller, project),
    )
}

pub(crate) async fn project_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match parse_id::<ProjectId>(&project_id, "project") {
        Ok(id) => respond(StatusCode::OK, state.service.get_project(&caller, id)),
        Err(response) => response,
    }
}

pub(crate) async fn update_project_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Path(project_id): Path<String>,
    JsonBody(update): JsonBody<ProjectUpdate>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match parse_id::<ProjectId>(&project_id, "project") {
        Ok(id) => respond(
            StatusCode::OK,
            state.service.update_project(&caller, id, update),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn delete_project_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let id = match parse_id::<ProjectId>(&project_id, "project") {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.service.delete_project(&caller, id) {
        Ok(()) => {
            let payload = json!({ "message": "Project deleted" });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn submit_check_in_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    JsonBody(submission): JsonBody<CheckInSubmission>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(
        StatusCode::CREATED,
        state.service.submit_check_in(&caller, submission),
    )
}

pub(crate) async fn list_check_ins_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match project_filter(&query) {
        Ok(project_id) => respond(
            StatusCode::OK,
            state.service.list_check_ins(&caller, project_id),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn submit_feedback_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    JsonBody(submission): JsonBody<FeedbackSubmission>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(
        StatusCode::CREATED,
        state.service.submit_feedback(&caller, submission),
    )
}

pub(crate) async fn list_feedback_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match project_filter(&query) {
        Ok(project_id) => respond(
            StatusCode::OK,
            state.service.list_feedback(&caller, project_id),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn report_risk_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    JsonBody(report): JsonBody<RiskReport>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(
        StatusCode::CREATED,
        state.service.report_risk(&caller, report),
    )
}

pub(crate) async fn update_risk_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Path(risk_id): Path<String>,
    JsonBody(update): JsonBody<RiskUpdate>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match parse_id::<RiskId>(&risk_id, "risk") {
        Ok(id) => respond(
            StatusCode::OK,
            state.service.update_risk(&caller, id, update),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn list_risks_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let filters = project_filter(&query).and_then(|project_id| {
        parse_label::<RiskStatus>(query.status.as_ref(), "status")
            .map(|status| (project_id, status))
    });
    match filters {
        Ok((project_id, status)) => respond(
            StatusCode::OK,
            state.service.list_risks(&caller, project_id, status),
        ),
        Err(response) => response,
    }
}

pub(crate) async fn activity_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    match project_filter(&query) {
        Ok(Some(project_id)) => respond(
            StatusCode::OK,
            state.service.project_activity(&caller, project_id),
        ),
        Ok(None) => bad_request("project_id is required".to_string()),
        Err(response) => response,
    }
}

pub(crate) async fn portfolio_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    caller: Caller,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    respond(StatusCode::OK, state.service.portfolio(&caller))
}

pub(crate) async fn score_handler<R, L>(
    State(state): State<TrackingState<R, L>>,
    _caller: Caller,
    JsonBody(request): JsonBody<ScoreRequest>,
) -> Response
where
    R: TrackingRepository + 'static,
    L: ActivityLog + 'static,
{
    let report = state.service.preview(&request.inputs, request.now);
    (StatusCode::OK, Json(report)).into_response()
}
