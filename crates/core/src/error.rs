use crate::types::DbId;

/// Domain error taxonomy shared by the resolver, the booking engine and the
/// HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested window is not inside the member's resolved hours.
    #[error("Outside working hours: {0}")]
    OutOfAvailability(String),

    /// The requested window overlaps a non-cancelled appointment.
    #[error("Overlaps existing appointment {appointment_id}")]
    AppointmentConflict { appointment_id: DbId },

    /// A schedule record already exists for the same scope, owner and day.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lock contention or serialization failure. Safe to retry.
    #[error("Booking contention: {0}")]
    Concurrency(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the operation that produced this error may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}
