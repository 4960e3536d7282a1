//! Zero-sized repositories, one per table group.
//!
//! Functions take `&PgPool` for standalone reads and writes, and
//! `&mut PgConnection` where the caller drives a transaction.

pub mod appointment_repo;
pub mod event_repo;
pub mod member_repo;
pub mod service_repo;
pub mod special_date_repo;
pub mod weekly_rule_repo;

pub use appointment_repo::AppointmentRepo;
pub use event_repo::EventRepo;
pub use member_repo::MemberRepo;
pub use service_repo::ServiceRepo;
pub use special_date_repo::SpecialDateRepo;
pub use weekly_rule_repo::WeeklyRuleRepo;
