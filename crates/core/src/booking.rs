//! Booking arithmetic and conflict search.
//!
//! These functions hold the decision logic of a booking attempt; the engine
//! crate supplies the data and the serialization scope around them.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::appointment_status::AppointmentStatus;
use crate::availability::Resolution;
use crate::error::CoreError;
use crate::interval::TimeInterval;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest service duration accepted (one full day).
pub const MAX_DURATION_MINUTES: i32 = 24 * 60;

/// Maximum length of appointment notes.
pub const MAX_NOTES_LEN: usize = 2000;

/// Bits reserved for the day number in [`booking_lock_key`].
const LOCK_KEY_DAY_BITS: u32 = 20;

// ---------------------------------------------------------------------------
// Window computation
// ---------------------------------------------------------------------------

/// `start + duration_minutes`, rejecting durations that are non-positive or
/// that run past midnight.
pub fn compute_end_time(start: NaiveTime, duration_minutes: i32) -> Result<NaiveTime, CoreError> {
    if duration_minutes <= 0 || duration_minutes > MAX_DURATION_MINUTES {
        return Err(CoreError::Validation(format!(
            "Service duration must be between 1 and {MAX_DURATION_MINUTES} minutes, got {duration_minutes}"
        )));
    }
    let (end, wrapped_secs) =
        start.overflowing_add_signed(Duration::minutes(i64::from(duration_minutes)));
    // Ending exactly at midnight also wraps to 00:00, which cannot be an end.
    if wrapped_secs != 0 || end <= start {
        return Err(CoreError::Validation(format!(
            "Appointment starting at {start} for {duration_minutes} minutes would end after midnight"
        )));
    }
    Ok(end)
}

/// Build the requested window from either a service duration or an explicit
/// end time.
///
/// When a duration is known it wins; an explicit `end` must then agree with
/// it.
pub fn booking_window(
    start: NaiveTime,
    end: Option<NaiveTime>,
    service_duration_minutes: Option<i32>,
) -> Result<TimeInterval, CoreError> {
    let end = match (service_duration_minutes, end) {
        (Some(duration), None) => compute_end_time(start, duration)?,
        (Some(duration), Some(explicit)) => {
            let computed = compute_end_time(start, duration)?;
            if computed != explicit {
                return Err(CoreError::Validation(format!(
                    "end_time {explicit} does not match the service duration ({duration} minutes ends at {computed})"
                )));
            }
            computed
        }
        (None, Some(explicit)) => explicit,
        (None, None) => {
            return Err(CoreError::Validation(
                "end_time is required when no service is given".to_string(),
            ))
        }
    };
    TimeInterval::new(start, end)
}

pub fn validate_notes(notes: Option<&str>) -> Result<(), CoreError> {
    match notes {
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => Err(CoreError::Validation(
            format!("notes exceed {MAX_NOTES_LEN} characters"),
        )),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Availability and conflict checks
// ---------------------------------------------------------------------------

/// Fail with `OutOfAvailability` unless `window` fits the resolved day.
pub fn ensure_within_availability(
    resolution: &Resolution,
    window: &TimeInterval,
) -> Result<(), CoreError> {
    if resolution.covers(window) {
        return Ok(());
    }
    let detail = if resolution.is_closed() {
        format!("no working hours on {}", resolution.date)
    } else {
        format!(
            "{}-{} on {} is outside working hours",
            window.start(),
            window.end(),
            resolution.date
        )
    };
    Err(CoreError::OutOfAvailability(detail))
}

/// An existing appointment's footprint on a member's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSlot {
    pub appointment_id: DbId,
    pub interval: TimeInterval,
    pub status: AppointmentStatus,
}

/// Find the earliest slot that collides with `window`.
///
/// Cancelled slots never collide. `exclude` skips the appointment being
/// rescheduled so it does not conflict with itself.
pub fn find_conflict<'a, I>(
    window: &TimeInterval,
    existing: I,
    exclude: Option<DbId>,
) -> Option<&'a BookedSlot>
where
    I: IntoIterator<Item = &'a BookedSlot>,
{
    existing
        .into_iter()
        .filter(|slot| Some(slot.appointment_id) != exclude)
        .filter(|slot| slot.status.occupies_slot())
        .filter(|slot| slot.interval.overlaps(window))
        .min_by_key(|slot| (slot.interval.start(), slot.appointment_id))
}

/// Fail with `AppointmentConflict` naming the colliding appointment.
pub fn ensure_no_conflict(
    window: &TimeInterval,
    existing: &[BookedSlot],
    exclude: Option<DbId>,
) -> Result<(), CoreError> {
    match find_conflict(window, existing, exclude) {
        Some(slot) => Err(CoreError::AppointmentConflict {
            appointment_id: slot.appointment_id,
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Serialization key
// ---------------------------------------------------------------------------

/// Key identifying the `(member, date)` pair whose bookings must be
/// serialized.
///
/// The low 20 bits carry the day number (days since 0001-01-01, good until
/// the 29th century) and the remaining bits the member id, so distinct pairs
/// map to distinct keys for any realistic member id.
pub fn booking_lock_key(member_id: DbId, date: NaiveDate) -> i64 {
    let day = i64::from(date.num_days_from_ce()) & ((1 << LOCK_KEY_DAY_BITS) - 1);
    (member_id << LOCK_KEY_DAY_BITS) | day
}
