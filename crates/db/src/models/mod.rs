pub mod appointment;
pub mod event;
pub mod member;
pub mod schedule;
pub mod service;
