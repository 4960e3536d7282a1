//! Agenda domain core.
//!
//! Pure scheduling logic with no I/O: time interval arithmetic, schedule
//! validation, layered availability resolution, the appointment status state
//! machine, and booking conflict checks. Storage and orchestration live in
//! `agenda-db` and `agenda-engine`.

pub mod appointment_status;
pub mod availability;
pub mod booking;
pub mod error;
pub mod interval;
pub mod schedule;
pub mod types;
