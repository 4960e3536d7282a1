//! Appointment status values and their state machine.
//!
//! Status strings are the persisted and wire representation (`programada`,
//! `confirmada`, ...). Anything else is rejected at the boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Initial state.
    #[default]
    #[serde(rename = "programada")]
    Scheduled,
    #[serde(rename = "confirmada")]
    Confirmed,
    #[serde(rename = "en_curso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "cancelada")]
    Cancelled,
    /// The contact did not attend.
    #[serde(rename = "no_asistio")]
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "programada",
            Self::Confirmed => "confirmada",
            Self::InProgress => "en_curso",
            Self::Completed => "completada",
            Self::Cancelled => "cancelada",
            Self::NoShow => "no_asistio",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Whether an appointment in this state still blocks its time slot.
    ///
    /// Only cancelled appointments free their slot; completed and no-show
    /// appointments keep it for historical conflict purposes.
    pub fn occupies_slot(self) -> bool {
        self != Self::Cancelled
    }

    /// Statuses reachable in one step from `self`.
    pub fn valid_transitions(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[InProgress, Cancelled, NoShow],
            InProgress => &[Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(self, to: AppointmentStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Validate a transition, describing the rejected edge on failure.
    pub fn validate_transition(self, to: AppointmentStatus) -> Result<(), CoreError> {
        if self.can_transition_to(to) {
            return Ok(());
        }
        let detail = if self.is_terminal() {
            format!("{self} is terminal and cannot change to {to}")
        } else {
            format!("{self} -> {to} is not allowed")
        };
        Err(CoreError::InvalidTransition(detail))
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown appointment status '{s}'")))
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
