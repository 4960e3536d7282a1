//! Weekly rule and special-date exception models.
//!
//! Rows decode `scope` straight into [`ScheduleScope`]; a value outside the
//! CHECK constraint surfaces as a decode error rather than a silent default.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use agenda_core::error::CoreError;
use agenda_core::schedule::{
    validate_special_date, validate_weekly_rule, DaySchedule, ScheduleScope,
};
use agenda_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Weekly rules
// ---------------------------------------------------------------------------

/// A row from the `weekly_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeeklyRule {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub scope: ScheduleScope,
    pub owner_id: DbId,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_available: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WeeklyRule {
    /// What this rule says about a day that falls on its weekday.
    pub fn day_schedule(&self) -> Result<DaySchedule, CoreError> {
        validate_weekly_rule(
            self.day_of_week,
            self.start_time,
            self.end_time,
            self.break_start,
            self.break_end,
            self.is_available,
        )
    }
}

/// DTO for creating a weekly rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeeklyRule {
    pub scope: ScheduleScope,
    pub owner_id: DbId,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl CreateWeeklyRule {
    pub fn validate_schedule(&self) -> Result<DaySchedule, CoreError> {
        validate_weekly_rule(
            self.day_of_week,
            self.start_time,
            self.end_time,
            self.break_start,
            self.break_end,
            self.is_available,
        )
    }
}

/// DTO for replacing the hours of an existing weekly rule. Scope, owner and
/// day are fixed once created.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateWeeklyRule {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Special dates
// ---------------------------------------------------------------------------

/// A row from the `special_dates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpecialDate {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub scope: ScheduleScope,
    pub owner_id: DbId,
    pub special_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_available: bool,
    pub reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SpecialDate {
    pub fn day_schedule(&self) -> Result<DaySchedule, CoreError> {
        validate_special_date(
            self.start_time,
            self.end_time,
            self.break_start,
            self.break_end,
            self.is_available,
            self.reason.as_deref(),
        )
    }
}

/// DTO for creating a special-date exception.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecialDate {
    pub scope: ScheduleScope,
    pub owner_id: DbId,
    pub special_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    #[serde(default)]
    pub is_available: bool,
    pub reason: Option<String>,
}

impl CreateSpecialDate {
    pub fn validate_schedule(&self) -> Result<DaySchedule, CoreError> {
        validate_special_date(
            self.start_time,
            self.end_time,
            self.break_start,
            self.break_end,
            self.is_available,
            self.reason.as_deref(),
        )
    }
}
