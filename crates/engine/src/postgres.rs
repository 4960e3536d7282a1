//! PostgreSQL implementation of the store traits.
//!
//! Day transactions take `pg_advisory_xact_lock` on each `(member, date)`
//! key after bounding the wait with `lock_timeout`; the exclusion
//! constraint on `appointments` backs the lock up.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::error::CoreError;
use agenda_core::schedule::ScheduleScope;
use agenda_core::types::DbId;
use agenda_db::locks::lock_member_day;
use agenda_db::models::appointment::{Appointment, NewAppointment};
use agenda_db::models::member::Member;
use agenda_db::models::schedule::{SpecialDate, WeeklyRule};
use agenda_db::models::service::Service;
use agenda_db::repositories::{
    AppointmentRepo, MemberRepo, ServiceRepo, SpecialDateRepo, WeeklyRuleRepo,
};

use crate::store::{lock_order, AppointmentStore, DayTransaction, ScheduleStore};

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// `lock_not_available`, raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const EXCLUSION_VIOLATION: &str = "23P01";
const UNIQUE_VIOLATION: &str = "23505";

/// Map a database failure onto the domain taxonomy.
pub fn classify_sqlx_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::PoolTimedOut => {
            CoreError::Concurrency("Timed out waiting for a database connection".to_string())
        }
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(LOCK_NOT_AVAILABLE) => {
                CoreError::Concurrency("Timed out waiting for the booking lock".to_string())
            }
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                CoreError::Concurrency(db_err.message().to_string())
            }
            Some(EXCLUSION_VIOLATION) => CoreError::Concurrency(
                "An overlapping appointment was committed concurrently".to_string(),
            ),
            Some(UNIQUE_VIOLATION) => CoreError::Conflict(format!(
                "Duplicate record violates {}",
                db_err.constraint().unwrap_or("a unique constraint")
            )),
            _ => {
                tracing::error!(error = %err, "Unexpected database error");
                CoreError::Internal(err.to_string())
            }
        },
        _ => {
            tracing::error!(error = %err, "Database failure");
            CoreError::Internal(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn member(&self, member_id: DbId) -> Result<Option<Member>, CoreError> {
        MemberRepo::find_by_id(&self.pool, member_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn service(&self, service_id: DbId) -> Result<Option<Service>, CoreError> {
        ServiceRepo::find_by_id(&self.pool, service_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn weekly_rule(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        day_of_week: i16,
    ) -> Result<Option<WeeklyRule>, CoreError> {
        WeeklyRuleRepo::find_for_day(&self.pool, scope, owner_id, day_of_week)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn special_date(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<SpecialDate>, CoreError> {
        SpecialDateRepo::find_for_date(&self.pool, scope, owner_id, date)
            .await
            .map_err(classify_sqlx_error)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        AppointmentRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn list_day(
        &self,
        member_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, CoreError> {
        let mut conn = self.pool.acquire().await.map_err(classify_sqlx_error)?;
        AppointmentRepo::list_for_member_day(&mut conn, member_id, date, false)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn begin_days(
        &self,
        days: &[(DbId, NaiveDate)],
        lock_timeout: Duration,
    ) -> Result<Box<dyn DayTransaction>, CoreError> {
        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        for (member_id, date) in lock_order(days) {
            lock_member_day(&mut tx, member_id, date, lock_timeout)
                .await
                .map_err(classify_sqlx_error)?;
        }
        Ok(Box::new(PgDayTransaction { tx }))
    }

    async fn transition_status(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError> {
        AppointmentRepo::transition_status(&self.pool, id, from, to)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn delete(&self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        AppointmentRepo::delete(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)
    }
}

// ---------------------------------------------------------------------------
// PgDayTransaction
// ---------------------------------------------------------------------------

/// An open transaction holding advisory locks. Rolled back by sqlx on drop.
struct PgDayTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DayTransaction for PgDayTransaction {
    async fn appointment(&mut self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        AppointmentRepo::find_by_id_in(&mut self.tx, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn appointments(
        &mut self,
        member_id: DbId,
        date: NaiveDate,
        exclude_cancelled: bool,
    ) -> Result<Vec<Appointment>, CoreError> {
        AppointmentRepo::list_for_member_day(&mut self.tx, member_id, date, exclude_cancelled)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn insert(&mut self, input: &NewAppointment) -> Result<Appointment, CoreError> {
        AppointmentRepo::insert(&mut self.tx, input)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn update(
        &mut self,
        expected: &Appointment,
        input: &NewAppointment,
    ) -> Result<Option<Appointment>, CoreError> {
        AppointmentRepo::update(&mut self.tx, expected, input)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let PgDayTransaction { tx } = *self;
        tx.commit().await.map_err(classify_sqlx_error)
    }
}
