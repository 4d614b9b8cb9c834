//! HTTP-surface integration tests (§6/§8), grounded in the teacher's
//! `tests/mirror/apps/orchestrator` pattern of driving a `Router` with
//! `tower::ServiceExt::oneshot` against an in-memory store rather than a
//! bound socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gridx_coordinator::config::CoordinatorConfig;
use gridx_coordinator::routes::http_router;
use gridx_coordinator::state::AppState;
use gridx_credit_engine::{CreditEngine, CreditEngineConfig};
use gridx_infra_store::Store;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let store = Store::connect(":memory:", None).await.expect("in-memory store connects");
    let credit_engine = CreditEngine::new(CreditEngineConfig::default(), store.clone());
    let config = CoordinatorConfig {
        http_port: 0,
        ws_port: 0,
        db_path: ":memory:".into(),
        db_auth_token: None,
        allow_unauthenticated_hello: false,
        watchdog_check_interval_seconds: 15,
        watchdog_heartbeat_timeout_seconds: 30,
    };
    AppState::new(store, credit_engine, config)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

/// Submitting a job with a fresh user reserves credits at the default
/// timeout's cost and the job comes back queued (§8 happy path).
#[tokio::test]
async fn submit_job_reserves_credits_and_queues() {
    let state = test_state().await;
    let app = http_router(state.clone());

    let response = app
        .oneshot(post("/jobs", json!({"user_id": "alice", "code": "print('hi')"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["status"], "queued");
    assert!(body["reserved"].as_f64().unwrap() > 0.0);

    let balance = state.store.get_balance("alice").await.unwrap();
    assert_eq!(balance, 100.0 - body["reserved"].as_f64().unwrap());
}

/// A user with no balance (and a reservation above what `ensure_user`
/// grants) is rejected with 402, and no job row is created (§7).
#[tokio::test]
async fn submit_job_rejects_when_credits_insufficient() {
    let state = test_state().await;
    state.store.ensure_user("broke", 100.0).await.unwrap();
    state.store.deduct("broke", 100.0).await.unwrap();
    let app = http_router(state.clone());

    let response = app
        .oneshot(post(
            "/jobs",
            json!({"user_id": "broke", "code": "print('hi')", "limits": {"timeout_s": 600}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let jobs = state.store.list_jobs_by_submitter("broke", 10).await.unwrap();
    assert!(jobs.is_empty());
}

/// An invalid `user_id` is rejected at the boundary before anything
/// touches the store or the credit engine.
#[tokio::test]
async fn submit_job_rejects_invalid_user_id() {
    let state = test_state().await;
    let app = http_router(state);

    let response = app
        .oneshot(post("/jobs", json!({"user_id": "", "code": "print('hi')"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// `GET /jobs/{id}` round-trips a submitted job and 404s for an unknown id.
#[tokio::test]
async fn get_job_round_trips_and_404s() {
    let state = test_state().await;
    let app = http_router(state.clone());

    let submit = app
        .clone()
        .oneshot(post("/jobs", json!({"user_id": "alice", "code": "print(1)"})))
        .await
        .unwrap();
    let body = json_body(submit).await;
    let job_id = body["job_id"].as_str().unwrap();

    let fetched = app.clone().oneshot(get(&format!("/jobs/{job_id}"))).await.unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched_body = json_body(fetched).await;
    assert_eq!(fetched_body["status"], "queued");

    let missing = app.oneshot(get(&format!("/jobs/{}", uuid::Uuid::new_v4()))).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

/// `GET /credits/{user_id}` reads a zero balance for an unknown user
/// without creating a row (§9 resolved open question).
#[tokio::test]
async fn get_credits_does_not_create_unknown_user() {
    let state = test_state().await;
    let app = http_router(state.clone());

    let response = app.oneshot(get("/credits/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["balance"], 0.0);

    assert!(state.store.get_user_credits("nobody").await.unwrap().is_none());
}

/// `/health` and `/status` report shape expected by §6, with an empty
/// fleet and an empty queue at startup.
#[tokio::test]
async fn health_and_status_report_empty_fleet() {
    let state = test_state().await;
    let app = http_router(state);

    let health = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(json_body(health).await["status"], "healthy");

    let status = app.oneshot(get("/status")).await.unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let body = json_body(status).await;
    assert_eq!(body["workers"]["active"], 0);
    assert_eq!(body["workers"]["total"], 0);
    assert_eq!(body["queue_size"], 0);
}

/// `POST /workers/register` upserts a store row reachable via `GET
/// /workers`, independent of the live session Registry (I1).
#[tokio::test]
async fn register_worker_is_visible_in_worker_list() {
    let state = test_state().await;
    let app = http_router(state);
    let worker_id = uuid::Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(post("/workers/register", json!({"id": worker_id.to_string()})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list = app.oneshot(get("/workers")).await.unwrap();
    let body = json_body(list).await;
    let workers = body.as_array().unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0]["id"], worker_id.to_string());
}
