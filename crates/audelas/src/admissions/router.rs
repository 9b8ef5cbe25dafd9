use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::dashboard::{HighRiskQuery, PageRequest};
use super::domain::{EventType, InstitutionId, Principal, ProgramId, Role};
use super::repository::{AdmissionsRepository, CatalogRepository};
use super::service::{AdmissionsService, ApplicationServiceError};

/// Router builder exposing intake and dashboard endpoints.
pub fn admissions_router<R>(service: Arc<AdmissionsService<R>>) -> Router
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    Router::new()
        .route("/applications", post(apply_handler::<R>))
        .route("/events", post(track_handler::<R>))
        .route("/students/me/profile", get(profile_handler::<R>))
        .route("/students/me/scores", get(scores_handler::<R>))
        .route("/institutions/me", get(my_institution_handler::<R>))
        .route(
            "/institutions/:institution_id/programs",
            get(programs_handler::<R>),
        )
        .route(
            "/institutions/:institution_id/analytics/funnel",
            get(funnel_handler::<R>),
        )
        .route(
            "/institutions/:institution_id/high-risk-students",
            get(high_risk_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyRequest {
    pub(crate) program_id: ProgramId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackRequest {
    pub(crate) program_id: ProgramId,
    #[serde(rename = "type")]
    pub(crate) kind: EventType,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitParams {
    pub(crate) limit: Option<usize>,
}

fn error_response(err: ApplicationServiceError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "admissions request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn require_role(principal: &Principal, role: Role) -> Result<(), Response> {
    if principal.role == role {
        return Ok(());
    }
    let payload = json!({ "error": format!("requires {role:?} role") });
    Err((StatusCode::FORBIDDEN, Json(payload)).into_response())
}

fn respond<T: serde::Serialize>(result: Result<T, ApplicationServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /applications`: the score is refreshed after this responds.
pub(crate) async fn apply_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
    Json(request): Json<ApplyRequest>,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    if let Err(response) = require_role(&principal, Role::Student) {
        return response;
    }
    respond(service.apply(principal.id, request.program_id))
}

pub(crate) async fn track_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
    Json(request): Json<TrackRequest>,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    if let Err(response) = require_role(&principal, Role::Student) {
        return response;
    }
    respond(service.record_event(principal.id, request.program_id, request.kind))
}

pub(crate) async fn profile_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    respond(service.student_profile(principal.id))
}

pub(crate) async fn scores_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    respond(service.student_scores(principal.id))
}

pub(crate) async fn my_institution_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    if let Err(response) = require_role(&principal, Role::InstitutionAdmin) {
        return response;
    }
    respond(service.institution_for_admin(principal.id))
}

/// Open to any authenticated caller; students browse programs too.
pub(crate) async fn programs_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    _principal: Principal,
    Path(institution_id): Path<u64>,
    Query(page): Query<PageRequest>,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    match service.programs(InstitutionId(institution_id), page) {
        Ok(programs) => (StatusCode::OK, Json(json!({ "data": programs }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn funnel_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
    Path(institution_id): Path<u64>,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    if let Err(response) = require_role(&principal, Role::InstitutionAdmin) {
        return response;
    }
    respond(service.funnel(InstitutionId(institution_id)))
}

pub(crate) async fn high_risk_handler<R>(
    State(service): State<Arc<AdmissionsService<R>>>,
    principal: Principal,
    Path(institution_id): Path<u64>,
    Query(params): Query<LimitParams>,
) -> Response
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    if let Err(response) = require_role(&principal, Role::InstitutionAdmin) {
        return response;
    }
    let query = HighRiskQuery::with_limit(params.limit);
    respond(service.high_risk_students(InstitutionId(institution_id), query))
}
