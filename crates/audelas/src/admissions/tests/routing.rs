use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use super::common::*;
use crate::admissions::domain::{PairKey, UserId};
use crate::admissions::memory::InMemoryAdmissionsRepository;
use crate::admissions::principal::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::admissions::repository::AdmissionsRepository;
use crate::admissions::router::admissions_router;
use crate::admissions::scoring::ProgramScores;
use crate::admissions::service::AdmissionsService;

struct Harness {
    router: Router,
    service: Arc<AdmissionsService<InMemoryAdmissionsRepository>>,
    store: Arc<InMemoryAdmissionsRepository>,
    fixture: Fixture,
    _worker: JoinHandle<()>,
}

fn harness() -> Harness {
    let (store, fixture) = seeded_store();
    let store = Arc::new(store);
    let (service, worker) = build_service(store.clone());
    let service = Arc::new(service);
    Harness {
        router: admissions_router(service.clone()),
        service,
        store,
        fixture,
        _worker: worker,
    }
}

fn request(
    method: Method,
    uri: &str,
    caller: Option<(UserId, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = caller {
        builder = builder
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, role);
    }
    let body = match body {
        Some(payload) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

#[tokio::test]
async fn student_applies_once() {
    let harness = harness();
    let student = Some((harness.fixture.student, "student"));
    let payload = json!({ "programId": harness.fixture.matching_program });

    let response = harness
        .router
        .clone()
        .oneshot(request(Method::POST, "/applications", student, Some(payload.clone())))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "APPLIED");
    assert_eq!(body["programId"], json!(harness.fixture.matching_program));

    let response = harness
        .router
        .clone()
        .oneshot(request(Method::POST, "/applications", student, Some(payload)))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("already applied")));
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let harness = harness();
    let payload = json!({ "programId": harness.fixture.matching_program });

    let response = harness
        .router
        .oneshot(request(Method::POST, "/applications", None, Some(payload)))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_cannot_apply() {
    let harness = harness();
    let admin = Some((harness.fixture.admin, "institution_admin"));
    let payload = json!({ "programId": harness.fixture.matching_program });

    let response = harness
        .router
        .oneshot(request(Method::POST, "/applications", admin, Some(payload)))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(harness.store.application_count(harness.fixture.pair()), Ok(0));
}

#[tokio::test]
async fn scores_are_visible_after_worker_catches_up() {
    let harness = harness();
    let student = Some((harness.fixture.student, "student"));
    let track = json!({ "programId": harness.fixture.partial_program, "type": "VIEW" });

    let response = harness
        .router
        .clone()
        .oneshot(request(Method::POST, "/events", student, Some(track)))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    harness.service.queue().flush().await.expect("worker alive");
    let response = harness
        .router
        .clone()
        .oneshot(request(Method::GET, "/students/me/scores", student, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let scores = body.as_array().expect("score list");
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0]["engagementScore"], 5.0);
    assert_eq!(scores[0]["program"]["id"], json!(harness.fixture.partial_program));
}

#[tokio::test]
async fn programs_are_paginated() {
    let harness = harness();
    let student = Some((harness.fixture.student, "student"));
    let uri = format!(
        "/institutions/{}/programs?page=2&limit=1",
        harness.fixture.institution
    );

    let response = harness
        .router
        .oneshot(request(Method::GET, &uri, student, None))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let data = body["data"].as_array().expect("data array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], json!(harness.fixture.partial_program));
}

#[tokio::test]
async fn admin_sees_funnel_and_institution() {
    let harness = harness();
    harness
        .service
        .apply(harness.fixture.student, harness.fixture.matching_program)
        .expect("application accepted");
    let admin = Some((harness.fixture.admin, "INSTITUTION_ADMIN"));

    let response = harness
        .router
        .clone()
        .oneshot(request(Method::GET, "/institutions/me", admin, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["id"], json!(harness.fixture.institution));

    let uri = format!(
        "/institutions/{}/analytics/funnel",
        harness.fixture.institution
    );
    let response = harness
        .router
        .clone()
        .oneshot(request(Method::GET, &uri, admin, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body, json!([{ "status": "APPLIED", "count": 1 }]));
}

#[tokio::test]
async fn high_risk_lists_strong_fit_with_low_engagement() {
    let harness = harness();
    let risky = PairKey::new(harness.fixture.student, harness.fixture.matching_program);
    let steady = PairKey::new(harness.fixture.student, harness.fixture.partial_program);
    harness
        .store
        .upsert_score(
            risky,
            ProgramScores {
                engagement: 0.0,
                fit: 90.0,
                yield_risk: 55.0,
            },
        )
        .expect("score stored");
    harness
        .store
        .upsert_score(
            steady,
            ProgramScores {
                engagement: 80.0,
                fit: 90.0,
                yield_risk: 15.0,
            },
        )
        .expect("score stored");
    let admin = Some((harness.fixture.admin, "institution_admin"));
    let uri = format!(
        "/institutions/{}/high-risk-students?limit=5",
        harness.fixture.institution
    );

    let response = harness
        .router
        .clone()
        .oneshot(request(Method::GET, &uri, admin, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let entries = body.as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["yieldRiskScore"], 55.0);
    assert_eq!(entries[0]["student"]["name"], "Kiara Patel");

    let student = Some((harness.fixture.student, "student"));
    let response = harness
        .router
        .oneshot(request(Method::GET, &uri, student, None))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
