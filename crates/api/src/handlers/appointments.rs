//! Handlers for the `/appointments` resource.
//!
//! Every write goes through the [`SchedulingEngine`](agenda_engine::SchedulingEngine),
//! which owns locking, conflict checks and event publication.

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::types::DbId;
use agenda_db::models::appointment::Appointment;
use agenda_engine::{AppointmentPatch, BookingRequest};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct ListAppointmentsQuery {
    #[validate(range(min = 1))]
    pub member_id: DbId,
    pub date: NaiveDate,
}

/// Body of `POST /appointments`.
///
/// Either `service_id` or `end_time` must be present; with a service the end
/// is derived from its duration.
#[derive(Debug, Deserialize, Validate)]
pub struct BookAppointmentRequest {
    #[validate(range(min = 1))]
    pub member_id: DbId,
    #[validate(range(min = 1))]
    pub contact_id: DbId,
    #[validate(range(min = 1))]
    pub service_id: Option<DbId>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

impl From<BookAppointmentRequest> for BookingRequest {
    fn from(body: BookAppointmentRequest) -> Self {
        BookingRequest {
            member_id: body.member_id,
            contact_id: body.contact_id,
            service_id: body.service_id,
            date: body.appointment_date,
            start_time: body.start_time,
            end_time: body.end_time,
            notes: body.notes,
        }
    }
}

/// Body of `PATCH /appointments/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    #[validate(range(min = 1))]
    pub member_id: Option<DbId>,
    #[validate(range(min = 1))]
    pub contact_id: Option<DbId>,
    pub appointment_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl From<UpdateAppointmentRequest> for AppointmentPatch {
    fn from(body: UpdateAppointmentRequest) -> Self {
        AppointmentPatch {
            member_id: body.member_id,
            contact_id: body.contact_id,
            appointment_date: body.appointment_date,
            start_time: body.start_time,
            end_time: body.end_time,
            status: body.status,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTimeRequest {
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/appointments?member_id=&date=
///
/// All appointments of a member on a date, cancelled ones included.
pub async fn list_appointments(
    State(state): State<AppState>,
    Query(params): Query<ListAppointmentsQuery>,
) -> AppResult<Json<DataResponse<Vec<Appointment>>>> {
    params.validate()?;
    let appointments = state
        .engine
        .list_appointments(params.member_id, params.date)
        .await?;
    tracing::debug!(
        member_id = params.member_id,
        date = %params.date,
        count = appointments.len(),
        "Listed appointments"
    );
    Ok(Json(DataResponse { data: appointments }))
}

/// POST /api/v1/appointments
///
/// Returns 422 outside working hours and 409 with
/// `conflicting_appointment_id` on overlap.
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(body): Json<BookAppointmentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Appointment>>)> {
    body.validate()?;
    let appointment = state.engine.book_appointment(body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: appointment }),
    ))
}

/// GET /api/v1/appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = state.engine.get_appointment(id).await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// PATCH /api/v1/appointments/{id}
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    body.validate()?;
    let appointment = state.engine.update_appointment(id, body.into()).await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// PUT /api/v1/appointments/{id}/time
pub async fn update_appointment_time(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateTimeRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = state
        .engine
        .update_appointment_time(id, body.appointment_date, body.start_time, body.end_time)
        .await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// PUT /api/v1/appointments/{id}/status
///
/// Returns 409 `INVALID_TRANSITION` for moves the state machine forbids.
pub async fn change_appointment_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = state
        .engine
        .change_appointment_status(id, body.status)
        .await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// DELETE /api/v1/appointments/{id}
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.engine.delete_appointment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
