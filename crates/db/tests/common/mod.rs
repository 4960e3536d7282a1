use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::types::DbId;
use agenda_db::models::appointment::NewAppointment;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Insert an organization with one active member, returning `(org_id, member_id)`.
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

pub fn new_appointment(member_id: DbId, start: NaiveTime, end: NaiveTime) -> NewAppointment {
    NewAppointment {
        member_id,
        contact_id: 100,
        service_id: None,
        appointment_date: monday(),
        start_time: start,
        end_time: end,
        status: AppointmentStatus::Scheduled,
        notes: None,
    }
}

pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}
