//! HTTP-level integration tests for availability and the `/appointments`
//! endpoints, running against the PostgreSQL store.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use agenda_core::types::DbId;
use common::{
    body_json, booking, build_test_app, delete, get, patch_json, post_json, put_json,
    seed_working_member, MONDAY,
};

async fn book(app: &axum::Router, member_id: DbId, start: &str, end: &str) -> DbId {
    let response = post_json(app.clone(), "/api/v1/appointments", booking(member_id, start, end)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_uses_member_rule_over_organization(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let response = get(
        app,
        &format!("/api/v1/members/{member_id}/availability?date={MONDAY}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["governed_by"], "member_rule");
    assert_eq!(
        json["data"]["intervals"],
        json!([
            { "start": "09:00:00", "end": "13:00:00" },
            { "start": "14:00:00", "end": "17:00:00" }
        ])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_for_unscheduled_day_is_empty(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    // Sunday has no rule in any layer.
    let response = get(
        app,
        &format!("/api/v1/members/{member_id}/availability?date=2026-10-18"),
    )
    .await;
    let json = body_json(response).await;
    assert!(json["data"]["governed_by"].is_null());
    assert_eq!(json["data"]["intervals"], json!([]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_for_unknown_member_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, &format!("/api/v1/members/999999/availability?date={MONDAY}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn availability_requires_a_valid_date(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let response = get(
        app,
        &format!("/api/v1/members/{member_id}/availability?date=2026-13-40"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_returns_created_appointment(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let response = post_json(
        app.clone(),
        "/api/v1/appointments",
        booking(member_id, "10:00:00", "11:00:00"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "programada");
    assert_eq!(json["data"]["start_time"], "10:00:00");
    assert_eq!(json["data"]["end_time"], "11:00:00");

    let id = json["data"]["id"].as_i64().unwrap();
    let response = get(app, &format!("/api/v1/appointments/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn overlapping_booking_is_409_with_conflicting_id(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let first = book(&app, member_id, "10:00:00", "11:00:00").await;

    let response = post_json(
        app.clone(),
        "/api/v1/appointments",
        booking(member_id, "10:30:00", "11:30:00"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "APPOINTMENT_CONFLICT");
    assert_eq!(json["conflicting_appointment_id"], first);

    // Touching intervals do not conflict.
    book(&app, member_id, "11:00:00", "12:00:00").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_across_the_break_is_422(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let response = post_json(
        app.clone(),
        "/api/v1/appointments",
        booking(member_id, "12:00:00", "13:00:00"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(
        app,
        "/api/v1/appointments",
        booking(member_id, "12:30:00", "13:30:00"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "OUT_OF_AVAILABILITY");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_with_service_derives_end_time(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (org_id, member_id) = seed_working_member(&app, &pool).await;
    let service_id: DbId = sqlx::query_scalar(
        "INSERT INTO services (organization_id, name, duration_minutes) \
         VALUES ($1, 'Consulta', 45) RETURNING id",
    )
    .bind(org_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let response = post_json(
        app,
        "/api/v1/appointments",
        json!({
            "member_id": member_id,
            "contact_id": 77,
            "service_id": service_id,
            "appointment_date": MONDAY,
            "start_time": "10:00:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["end_time"], "10:45:00");
    assert_eq!(json["data"]["service_id"], service_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_without_end_or_service_is_400(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let response = post_json(
        app,
        "/api/v1/appointments",
        json!({
            "member_id": member_id,
            "contact_id": 77,
            "appointment_date": MONDAY,
            "start_time": "10:00:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_with_non_positive_contact_is_400(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;

    let mut body = booking(member_id, "10:00:00", "11:00:00");
    body["contact_id"] = json!(0);
    let response = post_json(app, "/api/v1/appointments", body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_returns_the_members_day(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    book(&app, member_id, "15:00:00", "16:00:00").await;
    book(&app, member_id, "09:00:00", "10:00:00").await;

    let response = get(
        app,
        &format!("/api/v1/appointments?member_id={member_id}&date={MONDAY}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let starts: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["09:00:00", "15:00:00"]);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_moves_the_appointment(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;

    // Overlapping its own old slot is fine.
    let response = put_json(
        app.clone(),
        &format!("/api/v1/appointments/{id}/time"),
        json!({
            "appointment_date": MONDAY,
            "start_time": "10:30:00",
            "end_time": "11:30:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["start_time"], "10:30:00");
    assert_eq!(json["data"]["end_time"], "11:30:00");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_onto_another_appointment_is_409(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let blocker = book(&app, member_id, "15:00:00", "16:00:00").await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;

    let response = put_json(
        app,
        &format!("/api/v1/appointments/{id}/time"),
        json!({
            "appointment_date": MONDAY,
            "start_time": "15:30:00",
            "end_time": "16:30:00"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["conflicting_appointment_id"], blocker);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_start_keeps_duration_and_updates_notes(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "10:30:00").await;

    let response = patch_json(
        app,
        &format!("/api/v1/appointments/{id}"),
        json!({ "start_time": "11:00:00", "notes": "primera visita" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["start_time"], "11:00:00");
    assert_eq!(json["data"]["end_time"], "11:30:00");
    assert_eq!(json["data"]["notes"], "primera visita");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn patch_unknown_appointment_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let response = patch_json(app, "/api/v1/appointments/424242", json!({ "notes": "x" })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Status and delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_follows_the_state_machine(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;
    let uri = format!("/api/v1/appointments/{id}/status");

    let response = put_json(app.clone(), &uri, json!({ "status": "confirmada" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "confirmada");

    let response = put_json(app.clone(), &uri, json!({ "status": "programada" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_status_string_is_rejected(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;

    let response = put_json(
        app,
        &format!("/api/v1/appointments/{id}/status"),
        json!({ "status": "archivada" }),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_frees_the_slot(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;

    let response = put_json(
        app.clone(),
        &format!("/api/v1/appointments/{id}/status"),
        json!({ "status": "cancelada" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    book(&app, member_id, "10:00:00", "11:00:00").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_the_appointment(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, member_id) = seed_working_member(&app, &pool).await;
    let id = book(&app, member_id, "10:00:00", "11:00:00").await;
    let uri = format!("/api/v1/appointments/{id}");

    let response = delete(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(app.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(app, &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
