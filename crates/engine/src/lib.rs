//! Booking orchestration.
//!
//! [`SchedulingEngine`] resolves availability, checks conflicts and commits
//! appointments inside a per-(member, date) serialization scope provided by
//! an [`AppointmentStore`]. Two stores ship with the crate:
//! [`PgStore`](postgres::PgStore) for production and
//! [`MemoryStore`](memory::MemoryStore) for tests and local development.

pub mod config;
pub mod engine;
pub mod memory;
pub mod postgres;
pub mod resolver;
pub mod store;

pub use config::EngineConfig;
pub use engine::{AppointmentPatch, BookingRequest, SchedulingEngine};
pub use resolver::AvailabilityResolver;
pub use store::{AppointmentStore, DayTransaction, ScheduleStore};
