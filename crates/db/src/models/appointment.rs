//! Appointment entity model and insert DTO.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::booking::BookedSlot;
use agenda_core::error::CoreError;
use agenda_core::interval::TimeInterval;
use agenda_core::types::{DbId, Timestamp};

/// A row from the `appointments` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub member_id: DbId,
    pub contact_id: DbId,
    pub service_id: Option<DbId>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    pub fn interval(&self) -> Result<TimeInterval, CoreError> {
        TimeInterval::new(self.start_time, self.end_time)
    }

    /// The slot this appointment occupies, for conflict checks.
    pub fn booked_slot(&self) -> Result<BookedSlot, CoreError> {
        Ok(BookedSlot {
            appointment_id: self.id,
            interval: self.interval()?,
            status: self.status,
        })
    }
}

/// Fully-resolved values written by an insert or a full-row update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub member_id: DbId,
    pub contact_id: DbId,
    pub service_id: Option<DbId>,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn interval(&self) -> Result<TimeInterval, CoreError> {
        TimeInterval::new(self.start_time, self.end_time)
    }
}

impl From<&Appointment> for NewAppointment {
    fn from(a: &Appointment) -> Self {
        Self {
            member_id: a.member_id,
            contact_id: a.contact_id,
            service_id: a.service_id,
            appointment_date: a.appointment_date,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status,
            notes: a.notes.clone(),
        }
    }
}
