use crate::infra::AppState;
use audelas::admissions::{
    admissions_router, AdmissionsRepository, AdmissionsService, CatalogRepository,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_admissions_routes<R>(service: Arc<AdmissionsService<R>>) -> axum::Router
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    let stats_service = service.clone();
    admissions_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/scoring/stats",
            axum::routing::get(move || scoring_stats_endpoint(stats_service.clone())),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Worker counters; `dropped` counts jobs lost to a full queue.
pub(crate) async fn scoring_stats_endpoint<R>(
    service: Arc<AdmissionsService<R>>,
) -> Json<serde_json::Value>
where
    R: AdmissionsRepository + 'static,
{
    let stats = service.queue().stats();
    Json(json!({
        "updated": stats.updated,
        "skipped": stats.skipped,
        "failed": stats.failed,
        "dropped": stats.dropped,
    }))
}
