//! Request handlers.
//!
//! Appointment and availability handlers delegate to the
//! [`SchedulingEngine`](agenda_engine::SchedulingEngine); schedule
//! administration validates in `agenda_core` and writes through the
//! repositories in `agenda_db`.

pub mod appointments;
pub mod availability;
pub mod schedules;
