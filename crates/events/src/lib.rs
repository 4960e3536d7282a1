//! Appointment events.
//!
//! - [`EventBus`] fans [`AgendaEvent`]s out to live subscribers and queues
//!   them for the log.
//! - [`EventPersistence`] writes the queued events to the `events` table.

pub mod bus;
pub mod persistence;

pub use bus::{AgendaEvent, AppointmentEventKind, EventBus};
pub use persistence::EventPersistence;
