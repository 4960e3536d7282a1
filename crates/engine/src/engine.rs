//! Booking orchestration: book, reschedule, change status, delete.
//!
//! Every write that can create an overlap runs inside a [`DayTransaction`]
//! holding the booking lock of each affected `(member, date)`, so the
//! conflict query and the write it guards are atomic. Contention is retried
//! with exponential backoff before it is surfaced as
//! [`CoreError::Concurrency`]. Events are published only after commit.

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::availability::Resolution;
use agenda_core::booking::{
    booking_window, compute_end_time, ensure_no_conflict, ensure_within_availability,
    validate_notes, BookedSlot,
};
use agenda_core::error::CoreError;
use agenda_core::interval::TimeInterval;
use agenda_core::types::DbId;
use agenda_db::models::appointment::{Appointment, NewAppointment};
use agenda_db::models::member::Member;
use agenda_db::models::service::Service;
use agenda_events::{AgendaEvent, AppointmentEventKind, EventBus};

use crate::config::EngineConfig;
use crate::resolver::AvailabilityResolver;
use crate::store::{AppointmentStore, ScheduleStore};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A request to book a new appointment.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub member_id: DbId,
    pub contact_id: DbId,
    /// When given, the end time is derived from the service duration.
    pub service_id: Option<DbId>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Required when no service is given.
    pub end_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

/// Partial update of an appointment. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub member_id: Option<DbId>,
    pub contact_id: Option<DbId>,
    pub appointment_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// Without an explicit end, a new start keeps the current duration.
    pub end_time: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    /// Patch that only moves the appointment in time.
    pub fn reschedule(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            appointment_date: Some(date),
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Default::default()
        }
    }

    /// Compute the row that results from applying this patch to `current`.
    fn apply(&self, current: &Appointment) -> Result<NewAppointment, CoreError> {
        let mut target = NewAppointment::from(current);

        if let Some(member_id) = self.member_id {
            target.member_id = member_id;
        }
        if let Some(contact_id) = self.contact_id {
            target.contact_id = contact_id;
        }
        if let Some(date) = self.appointment_date {
            target.appointment_date = date;
        }

        match (self.start_time, self.end_time) {
            (None, None) => {}
            (start, Some(end)) => {
                target.start_time = start.unwrap_or(current.start_time);
                target.end_time = end;
            }
            (Some(start), None) => {
                let minutes = current.interval()?.duration_minutes();
                target.start_time = start;
                target.end_time = compute_end_time(start, minutes as i32)?;
            }
        }
        target.interval()?;

        if let Some(status) = self.status {
            if status != current.status {
                current.status.validate_transition(status)?;
                target.status = status;
            }
        }
        if let Some(notes) = &self.notes {
            target.notes = Some(notes.clone());
        }

        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SchedulingEngine {
    schedules: Arc<dyn ScheduleStore>,
    appointments: Arc<dyn AppointmentStore>,
    resolver: AvailabilityResolver,
    events: Arc<EventBus>,
    config: EngineConfig,
}

impl SchedulingEngine {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
        events: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver: AvailabilityResolver::new(Arc::clone(&schedules)),
            schedules,
            appointments,
            events,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bookable intervals of a member on a date. Recomputed on every call.
    pub async fn resolve_availability(
        &self,
        member_id: DbId,
        date: NaiveDate,
    ) -> Result<Resolution, CoreError> {
        self.resolver.resolve_member(member_id, date).await
    }

    pub async fn get_appointment(&self, id: DbId) -> Result<Appointment, CoreError> {
        self.appointments.find(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn list_appointments(
        &self,
        member_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, CoreError> {
        self.appointments.list_day(member_id, date).await
    }

    // -----------------------------------------------------------------------
    // Booking
    // -----------------------------------------------------------------------

    pub async fn book_appointment(&self, request: BookingRequest) -> Result<Appointment, CoreError> {
        validate_notes(request.notes.as_deref())?;

        let member = self.bookable_member(request.member_id).await?;
        let service = match request.service_id {
            Some(service_id) => Some(self.bookable_service(service_id, &member).await?),
            None => None,
        };
        let window = booking_window(
            request.start_time,
            request.end_time,
            service.as_ref().map(|s| s.duration_minutes),
        )?;

        let resolution = self.resolver.resolve(&member, request.date).await?;
        ensure_within_availability(&resolution, &window)?;

        let new = NewAppointment {
            member_id: member.id,
            contact_id: request.contact_id,
            service_id: request.service_id,
            appointment_date: request.date,
            start_time: window.start(),
            end_time: window.end(),
            status: AppointmentStatus::default(),
            notes: request.notes,
        };

        let appointment = self
            .with_retry("book_appointment", || self.try_insert(&new, &window))
            .await?;

        tracing::info!(
            appointment_id = appointment.id,
            member_id = appointment.member_id,
            date = %appointment.appointment_date,
            start = %appointment.start_time,
            end = %appointment.end_time,
            "Appointment booked"
        );
        self.publish(AppointmentEventKind::Created, &appointment);
        Ok(appointment)
    }

    async fn try_insert(
        &self,
        new: &NewAppointment,
        window: &TimeInterval,
    ) -> Result<Appointment, CoreError> {
        let mut tx = self
            .appointments
            .begin_days(
                &[(new.member_id, new.appointment_date)],
                self.config.lock_timeout,
            )
            .await?;

        let existing = tx
            .appointments(new.member_id, new.appointment_date, true)
            .await?;
        ensure_no_conflict(window, &booked_slots(&existing)?, None)?;

        let appointment = tx.insert(new).await?;
        tx.commit().await?;
        Ok(appointment)
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Move an appointment to a new date and window.
    pub async fn update_appointment_time(
        &self,
        id: DbId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Appointment, CoreError> {
        self.update_appointment(id, AppointmentPatch::reschedule(date, start_time, end_time))
            .await
    }

    /// Apply a partial update.
    ///
    /// Availability and conflicts are re-checked only when the member, date
    /// or window actually change. Terminal appointments cannot be moved.
    pub async fn update_appointment(
        &self,
        id: DbId,
        patch: AppointmentPatch,
    ) -> Result<Appointment, CoreError> {
        validate_notes(patch.notes.as_deref())?;

        let (updated, previous_status) = self
            .with_retry("update_appointment", || self.try_update(id, &patch))
            .await?;

        tracing::info!(
            appointment_id = id,
            member_id = updated.member_id,
            date = %updated.appointment_date,
            start = %updated.start_time,
            end = %updated.end_time,
            status = %updated.status,
            "Appointment updated"
        );
        self.publish(status_event(previous_status, updated.status), &updated);
        Ok(updated)
    }

    async fn try_update(
        &self,
        id: DbId,
        patch: &AppointmentPatch,
    ) -> Result<(Appointment, AppointmentStatus), CoreError> {
        let current = self.get_appointment(id).await?;
        let target = patch.apply(&current)?;

        let moved = target.member_id != current.member_id
            || target.appointment_date != current.appointment_date
            || target.start_time != current.start_time
            || target.end_time != current.end_time;
        let recheck = moved && target.status.occupies_slot();

        if moved && current.status.is_terminal() {
            return Err(CoreError::InvalidTransition(format!(
                "Appointment {id} is {} and cannot be rescheduled",
                current.status
            )));
        }

        if recheck {
            let member = self.bookable_member(target.member_id).await?;
            if target.member_id != current.member_id {
                if let Some(service_id) = target.service_id {
                    self.bookable_service(service_id, &member).await?;
                }
            }
            let resolution = self.resolver.resolve(&member, target.appointment_date).await?;
            ensure_within_availability(&resolution, &target.interval()?)?;
        }

        let mut tx = self
            .appointments
            .begin_days(
                &[
                    (current.member_id, current.appointment_date),
                    (target.member_id, target.appointment_date),
                ],
                self.config.lock_timeout,
            )
            .await?;

        // The unlocked read above must still be current.
        match tx.appointment(id).await? {
            Some(locked) if locked == current => {}
            Some(_) => return Err(changed_concurrently(id)),
            None => return Err(not_found(id)),
        }

        if recheck {
            let existing = tx
                .appointments(target.member_id, target.appointment_date, true)
                .await?;
            ensure_no_conflict(&target.interval()?, &booked_slots(&existing)?, Some(id))?;
        }

        // Status changes skip the day lock, so the write itself must not
        // clobber one that landed after the re-read.
        let updated = tx
            .update(&current, &target)
            .await?
            .ok_or_else(|| changed_concurrently(id))?;
        tx.commit().await?;
        Ok((updated, current.status))
    }

    /// Move an appointment along the status state machine.
    ///
    /// Status changes never create overlaps (no transition leaves
    /// `cancelada`), so no day lock is taken.
    pub async fn change_appointment_status(
        &self,
        id: DbId,
        status: AppointmentStatus,
    ) -> Result<Appointment, CoreError> {
        let (updated, previous_status) = self
            .with_retry("change_appointment_status", || self.try_transition(id, status))
            .await?;

        tracing::info!(
            appointment_id = id,
            from = %previous_status,
            to = %updated.status,
            "Appointment status changed"
        );
        self.publish(status_event(previous_status, updated.status), &updated);
        Ok(updated)
    }

    async fn try_transition(
        &self,
        id: DbId,
        status: AppointmentStatus,
    ) -> Result<(Appointment, AppointmentStatus), CoreError> {
        let current = self.get_appointment(id).await?;
        current.status.validate_transition(status)?;

        match self
            .appointments
            .transition_status(id, current.status, status)
            .await?
        {
            Some(updated) => Ok((updated, current.status)),
            None => Err(CoreError::Concurrency(format!(
                "Status of appointment {id} changed concurrently"
            ))),
        }
    }

    /// Remove an appointment regardless of its status.
    pub async fn delete_appointment(&self, id: DbId) -> Result<Appointment, CoreError> {
        let deleted = self
            .appointments
            .delete(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(appointment_id = id, member_id = deleted.member_id, "Appointment deleted");
        self.publish(AppointmentEventKind::Cancelled, &deleted);
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn bookable_member(&self, member_id: DbId) -> Result<Member, CoreError> {
        match self.schedules.member(member_id).await? {
            Some(member) if member.is_active => Ok(member),
            Some(_) => Err(CoreError::Validation(format!(
                "Member {member_id} is inactive"
            ))),
            None => Err(CoreError::Validation(format!(
                "Member {member_id} does not exist"
            ))),
        }
    }

    async fn bookable_service(&self, service_id: DbId, member: &Member) -> Result<Service, CoreError> {
        let service = self
            .schedules
            .service(service_id)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!("Service {service_id} does not exist"))
            })?;

        if !service.is_active {
            return Err(CoreError::Validation(format!(
                "Service {service_id} is inactive"
            )));
        }
        if service.organization_id != member.organization_id {
            return Err(CoreError::Validation(format!(
                "Service {service_id} belongs to another organization"
            )));
        }
        if !service.is_assigned_to(member.id) {
            return Err(CoreError::Validation(format!(
                "Member {} is not assigned to service {service_id}",
                member.id
            )));
        }
        Ok(service)
    }

    /// Run `attempt`, retrying contention failures with exponential backoff.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    let delay = self.config.backoff_for(retries);
                    tracing::warn!(
                        operation,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Booking contention, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(operation, retries, error = %err, "Giving up after contention");
                    }
                    return Err(err);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    fn publish(&self, kind: AppointmentEventKind, appointment: &Appointment) {
        let receivers = self.events.publish(AgendaEvent::appointment(kind, appointment));
        tracing::debug!(event = %kind, appointment_id = appointment.id, receivers, "Event published");
    }
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "Appointment",
        id,
    }
}

fn changed_concurrently(id: DbId) -> CoreError {
    CoreError::Concurrency(format!("Appointment {id} changed concurrently"))
}

fn booked_slots(appointments: &[Appointment]) -> Result<Vec<BookedSlot>, CoreError> {
    appointments.iter().map(Appointment::booked_slot).collect()
}

/// `appointment.cancelled` when an update cancels, `appointment.updated`
/// otherwise.
fn status_event(from: AppointmentStatus, to: AppointmentStatus) -> AppointmentEventKind {
    if to == AppointmentStatus::Cancelled && from != AppointmentStatus::Cancelled {
        AppointmentEventKind::Cancelled
    } else {
        AppointmentEventKind::Updated
    }
}
