#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use agenda_api::config::ServerConfig;
use agenda_api::router::build_app_router;
use agenda_api::state::AppState;
use agenda_core::types::DbId;
use agenda_engine::postgres::PgStore;
use agenda_engine::{EngineConfig, SchedulingEngine};
use agenda_events::EventBus;

/// Monday used across the API tests.
pub const MONDAY: &str = "2026-10-19";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// App state over a PostgreSQL-backed engine with fast lock timeouts.
pub fn build_test_state(pool: PgPool) -> AppState {
    let event_bus = Arc::new(EventBus::default());
    let store = Arc::new(PgStore::new(pool.clone()));
    let engine = Arc::new(SchedulingEngine::new(
        store.clone(),
        store,
        Arc::clone(&event_bus),
        EngineConfig {
            lock_timeout: Duration::from_millis(500),
            max_retries: 2,
            retry_backoff: Duration::from_millis(5),
        },
    ));

    AppState {
        pool,
        config: Arc::new(test_config()),
        event_bus,
        engine,
    }
}

/// Build the full application router over a PostgreSQL-backed engine.
///
/// Uses the same [`build_app_router`] as `main.rs`, so the middleware stack
/// under test is the production one.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(build_test_state(pool), &test_config())
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Insert an organization with one member, returning `(org_id, member_id)`.
pub async fn seed_member(pool: &PgPool) -> (DbId, DbId) {
    let org_id: DbId =
        sqlx::query_scalar("INSERT INTO organizations (name) VALUES ('Clinica') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let member_id: DbId = sqlx::query_scalar(
        "INSERT INTO members (organization_id, name) VALUES ($1, 'Ana') RETURNING id",
    )
    .bind(org_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (org_id, member_id)
}

/// Organization open Monday 08:00-18:00, member Monday 09:00-17:00 with a
/// 13:00-14:00 break. Returns `(org_id, member_id)`.
pub async fn seed_working_member(app: &Router, pool: &PgPool) -> (DbId, DbId) {
    let (org_id, member_id) = seed_member(pool).await;

    let response = post_json(
        app.clone(),
        "/api/v1/schedules/weekly-rules",
        json!({
            "scope": "organization",
            "owner_id": org_id,
            "day_of_week": 1,
            "start_time": "08:00:00",
            "end_time": "18:00:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app.clone(),
        "/api/v1/schedules/weekly-rules",
        json!({
            "scope": "member",
            "owner_id": member_id,
            "day_of_week": 1,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "break_start": "13:00:00",
            "break_end": "14:00:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    (org_id, member_id)
}

/// Booking body for the seeded Monday.
pub fn booking(member_id: DbId, start: &str, end: &str) -> Value {
    json!({
        "member_id": member_id,
        "contact_id": 77,
        "appointment_date": MONDAY,
        "start_time": start,
        "end_time": end
    })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(body)).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
