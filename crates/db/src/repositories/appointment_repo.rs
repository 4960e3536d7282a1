//! Repository for the `appointments` table.
//!
//! Writes that must observe the per-day booking lock take a
//! `&mut PgConnection` borrowed from the caller's transaction.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::types::DbId;

use crate::models::appointment::{Appointment, NewAppointment};

const COLUMNS: &str = "id, member_id, contact_id, service_id, appointment_date, \
    start_time, end_time, status, notes, created_at, updated_at";

/// Persistence for appointments.
pub struct AppointmentRepo;

impl AppointmentRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Re-read an appointment inside a transaction.
    pub async fn find_by_id_in(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Appointments of a member on a date, ordered by start time.
    pub async fn list_for_member_day(
        conn: &mut PgConnection,
        member_id: DbId,
        date: NaiveDate,
        exclude_cancelled: bool,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE member_id = $1 AND appointment_date = $2 \
               AND (NOT $3 OR status <> $4) \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(member_id)
            .bind(date)
            .bind(exclude_cancelled)
            .bind(AppointmentStatus::Cancelled.as_str())
            .fetch_all(conn)
            .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments \
                (member_id, contact_id, service_id, appointment_date, \
                 start_time, end_time, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.member_id)
            .bind(input.contact_id)
            .bind(input.service_id)
            .bind(input.appointment_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.status.as_str())
            .bind(&input.notes)
            .fetch_one(conn)
            .await
    }

    /// Overwrite every mutable column of `expected`, provided its status and
    /// `updated_at` are unchanged since it was read.
    ///
    /// Returns `None` when the row is gone or another writer got there first.
    pub async fn update(
        conn: &mut PgConnection,
        expected: &Appointment,
        input: &NewAppointment,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET \
                member_id = $2, contact_id = $3, service_id = $4, appointment_date = $5, \
                start_time = $6, end_time = $7, status = $8, notes = $9, updated_at = NOW() \
             WHERE id = $1 AND status = $10 AND updated_at = $11 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(expected.id)
            .bind(input.member_id)
            .bind(input.contact_id)
            .bind(input.service_id)
            .bind(input.appointment_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.status.as_str())
            .bind(&input.notes)
            .bind(expected.status.as_str())
            .bind(expected.updated_at)
            .fetch_optional(conn)
            .await
    }

    /// Move an appointment to `to` only if it is still in `from`.
    ///
    /// Returns `None` when the row is gone or its status changed underneath.
    pub async fn transition_status(
        pool: &PgPool,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("DELETE FROM appointments WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
