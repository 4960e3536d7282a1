//! Schedule scopes, working windows and write-time validation.
//!
//! Weekly rules and special-date exceptions are validated here before they
//! are persisted, so the resolver can assume every stored record is
//! well-formed.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::interval::TimeInterval;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Scope value for organization-wide schedule records.
pub const SCOPE_ORGANIZATION: &str = "organization";

/// Scope value for member-specific schedule records.
pub const SCOPE_MEMBER: &str = "member";

/// Valid `day_of_week` values, Sunday = 0.
pub const MIN_DAY_OF_WEEK: i16 = 0;
pub const MAX_DAY_OF_WEEK: i16 = 6;

/// Maximum length of a special-date `reason`.
pub const MAX_REASON_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Who a schedule record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleScope {
    Organization,
    Member,
}

impl ScheduleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organization => SCOPE_ORGANIZATION,
            Self::Member => SCOPE_MEMBER,
        }
    }
}

impl fmt::Display for ScheduleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SCOPE_ORGANIZATION => Ok(Self::Organization),
            SCOPE_MEMBER => Ok(Self::Member),
            other => Err(CoreError::Validation(format!(
                "Invalid scope '{other}'. Expected '{SCOPE_ORGANIZATION}' or '{SCOPE_MEMBER}'"
            ))),
        }
    }
}

impl TryFrom<String> for ScheduleScope {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Working window
// ---------------------------------------------------------------------------

/// An opening window with an optional break carved out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleWindow {
    hours: TimeInterval,
    break_time: Option<TimeInterval>,
}

impl ScheduleWindow {
    /// Validate and build a window.
    ///
    /// Checks:
    /// - `start < end`
    /// - break fields are given together or not at all
    /// - `break_start < break_end`
    /// - the break lies within `[start, end]`
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        break_start: Option<NaiveTime>,
        break_end: Option<NaiveTime>,
    ) -> Result<Self, CoreError> {
        let hours = TimeInterval::new(start, end)?;

        let break_time = match (break_start, break_end) {
            (None, None) => None,
            (Some(b0), Some(b1)) => {
                if b0 >= b1 {
                    return Err(CoreError::Validation(format!(
                        "break_start ({b0}) must be before break_end ({b1})"
                    )));
                }
                if b0 < start || b1 > end {
                    return Err(CoreError::Validation(format!(
                        "Break {b0}-{b1} must lie within working hours {start}-{end}"
                    )));
                }
                Some(TimeInterval::new(b0, b1)?)
            }
            _ => {
                return Err(CoreError::Validation(
                    "break_start and break_end must be provided together".to_string(),
                ))
            }
        };

        Ok(Self { hours, break_time })
    }

    pub fn hours(&self) -> TimeInterval {
        self.hours
    }

    pub fn break_time(&self) -> Option<TimeInterval> {
        self.break_time
    }

    /// Working hours net of the break, in order.
    pub fn bookable_intervals(&self) -> Vec<TimeInterval> {
        match self.break_time {
            Some(cut) => self.hours.subtract(&cut),
            None => vec![self.hours],
        }
    }
}

// ---------------------------------------------------------------------------
// Day schedule
// ---------------------------------------------------------------------------

/// What a single schedule record says about one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DaySchedule {
    /// The owner does not work that day.
    Unavailable,
    /// The owner works inside this window.
    Open(ScheduleWindow),
}

impl DaySchedule {
    pub fn intervals(&self) -> Vec<TimeInterval> {
        match self {
            Self::Unavailable => Vec::new(),
            Self::Open(window) => window.bookable_intervals(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Day-of-week index used by weekly rules (Sunday = 0 .. Saturday = 6).
pub fn day_of_week(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_sunday() as i16
}

pub fn validate_day_of_week(day_of_week: i16) -> Result<(), CoreError> {
    if !(MIN_DAY_OF_WEEK..=MAX_DAY_OF_WEEK).contains(&day_of_week) {
        return Err(CoreError::Validation(format!(
            "day_of_week must be between {MIN_DAY_OF_WEEK} and {MAX_DAY_OF_WEEK}, got {day_of_week}"
        )));
    }
    Ok(())
}

/// Validate a weekly rule before it is written.
///
/// The window is validated even when `is_available` is false, since the
/// stored times must still be ordered.
pub fn validate_weekly_rule(
    day_of_week: i16,
    start: NaiveTime,
    end: NaiveTime,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    is_available: bool,
) -> Result<DaySchedule, CoreError> {
    validate_day_of_week(day_of_week)?;
    let window = ScheduleWindow::new(start, end, break_start, break_end)?;
    Ok(if is_available {
        DaySchedule::Open(window)
    } else {
        DaySchedule::Unavailable
    })
}

/// Validate a special-date exception before it is written.
///
/// An available exception must carry both `start` and `end`. An unavailable
/// one may omit times entirely; any times it does carry must still be valid.
pub fn validate_special_date(
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
    is_available: bool,
    reason: Option<&str>,
) -> Result<DaySchedule, CoreError> {
    if let Some(reason) = reason {
        if reason.len() > MAX_REASON_LEN {
            return Err(CoreError::Validation(format!(
                "reason exceeds {MAX_REASON_LEN} characters"
            )));
        }
    }

    match (start, end) {
        (Some(start), Some(end)) => {
            let window = ScheduleWindow::new(start, end, break_start, break_end)?;
            Ok(if is_available {
                DaySchedule::Open(window)
            } else {
                DaySchedule::Unavailable
            })
        }
        (None, None) if !is_available => {
            if break_start.is_some() || break_end.is_some() {
                return Err(CoreError::Validation(
                    "A break requires start_time and end_time".to_string(),
                ));
            }
            Ok(DaySchedule::Unavailable)
        }
        (None, None) => Err(CoreError::Validation(
            "An available special date requires start_time and end_time".to_string(),
        )),
        _ => Err(CoreError::Validation(
            "start_time and end_time must be provided together".to_string(),
        )),
    }
}
