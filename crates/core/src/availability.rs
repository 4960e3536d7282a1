//! Layered availability resolution.
//!
//! A member's bookable time on a date is decided by the first schedule layer
//! that has a record, in this order:
//!
//! 1. member special-date exception
//! 2. organization special-date exception
//! 3. member weekly rule for the day of week
//! 4. organization weekly rule for the day of week
//!
//! If no layer has a record the day is closed. Resolution is a pure function
//! of the records passed in; nothing is cached.

use chrono::NaiveDate;
use serde::Serialize;

use crate::interval::{is_covered, TimeInterval};
use crate::schedule::{DaySchedule, ScheduleScope};

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// One link of the precedence chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleLayer {
    MemberException,
    OrganizationException,
    MemberRule,
    OrganizationRule,
}

impl ScheduleLayer {
    /// Layers from highest to lowest precedence.
    pub const PRECEDENCE: [ScheduleLayer; 4] = [
        ScheduleLayer::MemberException,
        ScheduleLayer::OrganizationException,
        ScheduleLayer::MemberRule,
        ScheduleLayer::OrganizationRule,
    ];

    /// Which owner the layer's records are scoped to.
    pub fn scope(self) -> ScheduleScope {
        match self {
            Self::MemberException | Self::MemberRule => ScheduleScope::Member,
            Self::OrganizationException | Self::OrganizationRule => ScheduleScope::Organization,
        }
    }

    /// Whether the layer reads special-date exceptions (as opposed to weekly
    /// rules).
    pub fn is_exception(self) -> bool {
        matches!(self, Self::MemberException | Self::OrganizationException)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The bookable time of one member on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub date: NaiveDate,
    /// The layer whose record decided the day, or `None` when no schedule
    /// exists anywhere in the chain.
    pub governed_by: Option<ScheduleLayer>,
    /// Disjoint, ordered, half-open intervals net of breaks.
    pub intervals: Vec<TimeInterval>,
}

impl Resolution {
    /// A day with no schedule record in any layer.
    pub fn unscheduled(date: NaiveDate) -> Self {
        Self {
            date,
            governed_by: None,
            intervals: Vec::new(),
        }
    }

    /// A day decided by `schedule` found at `layer`.
    pub fn governed(date: NaiveDate, layer: ScheduleLayer, schedule: &DaySchedule) -> Self {
        Self {
            date,
            governed_by: Some(layer),
            intervals: schedule.intervals(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether `window` fits inside the resolved intervals.
    pub fn covers(&self, window: &TimeInterval) -> bool {
        is_covered(window, &self.intervals)
    }
}

/// The four optional records that can govern a member's day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayeredSchedule {
    pub member_exception: Option<DaySchedule>,
    pub organization_exception: Option<DaySchedule>,
    pub member_rule: Option<DaySchedule>,
    pub organization_rule: Option<DaySchedule>,
}

impl LayeredSchedule {
    pub fn get(&self, layer: ScheduleLayer) -> Option<&DaySchedule> {
        match layer {
            ScheduleLayer::MemberException => self.member_exception.as_ref(),
            ScheduleLayer::OrganizationException => self.organization_exception.as_ref(),
            ScheduleLayer::MemberRule => self.member_rule.as_ref(),
            ScheduleLayer::OrganizationRule => self.organization_rule.as_ref(),
        }
    }

    /// Resolve the day, taking the first layer that has a record.
    pub fn resolve(&self, date: NaiveDate) -> Resolution {
        ScheduleLayer::PRECEDENCE
            .iter()
            .find_map(|&layer| {
                self.get(layer)
                    .map(|schedule| Resolution::governed(date, layer, schedule))
            })
            .unwrap_or_else(|| Resolution::unscheduled(date))
    }
}
