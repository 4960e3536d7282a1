//! Storage seams consumed by the resolver and the booking engine.
//!
//! Implementations map their native failures onto [`CoreError`]: lock
//! timeouts and serialization failures become `Concurrency`, duplicate
//! records `Conflict`, anything unexpected `Internal`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::booking::booking_lock_key;
use agenda_core::error::CoreError;
use agenda_core::schedule::ScheduleScope;
use agenda_core::types::DbId;
use agenda_db::models::appointment::{Appointment, NewAppointment};
use agenda_db::models::member::Member;
use agenda_db::models::schedule::{SpecialDate, WeeklyRule};
use agenda_db::models::service::Service;

/// Read-only access to members, services and schedule records.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn member(&self, member_id: DbId) -> Result<Option<Member>, CoreError>;

    async fn service(&self, service_id: DbId) -> Result<Option<Service>, CoreError>;

    async fn weekly_rule(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        day_of_week: i16,
    ) -> Result<Option<WeeklyRule>, CoreError>;

    async fn special_date(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<SpecialDate>, CoreError>;
}

/// Appointment persistence with per-(member, date) serialization.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, CoreError>;

    /// Every appointment of a member on a date, cancelled ones included,
    /// ordered by start time.
    async fn list_day(&self, member_id: DbId, date: NaiveDate)
        -> Result<Vec<Appointment>, CoreError>;

    /// Open a transaction holding the booking lock of every `(member, date)`
    /// in `days`, waiting at most `lock_timeout` for each.
    async fn begin_days(
        &self,
        days: &[(DbId, NaiveDate)],
        lock_timeout: Duration,
    ) -> Result<Box<dyn DayTransaction>, CoreError>;

    /// Set `to` only if the appointment is still in `from`.
    async fn transition_status(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError>;

    /// Remove an appointment, returning the removed row.
    async fn delete(&self, id: DbId) -> Result<Option<Appointment>, CoreError>;
}

/// Work done while holding day locks. Dropping without [`commit`] rolls
/// back every write and releases the locks.
///
/// [`commit`]: DayTransaction::commit
#[async_trait]
pub trait DayTransaction: Send {
    async fn appointment(&mut self, id: DbId) -> Result<Option<Appointment>, CoreError>;

    async fn appointments(
        &mut self,
        member_id: DbId,
        date: NaiveDate,
        exclude_cancelled: bool,
    ) -> Result<Vec<Appointment>, CoreError>;

    async fn insert(&mut self, input: &NewAppointment) -> Result<Appointment, CoreError>;

    /// Overwrite `expected` with `input` if the stored row still has the
    /// status and `updated_at` of `expected`. `None` when the row is gone or
    /// was changed by another writer.
    async fn update(
        &mut self,
        expected: &Appointment,
        input: &NewAppointment,
    ) -> Result<Option<Appointment>, CoreError>;

    async fn commit(self: Box<Self>) -> Result<(), CoreError>;
}

/// Deduplicate `days` and order them by lock key, so that transactions
/// locking several days always acquire them in the same order.
pub fn lock_order(days: &[(DbId, NaiveDate)]) -> Vec<(DbId, NaiveDate)> {
    let mut ordered: Vec<_> = days.to_vec();
    ordered.sort_by_key(|&(member_id, date)| booking_lock_key(member_id, date));
    ordered.dedup();
    ordered
}
