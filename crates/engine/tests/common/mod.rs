#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

use agenda_core::schedule::ScheduleScope;
use agenda_core::types::DbId;
use agenda_db::models::member::Member;
use agenda_db::models::schedule::{CreateSpecialDate, CreateWeeklyRule};
use agenda_engine::memory::MemoryStore;
use agenda_engine::{BookingRequest, EngineConfig, SchedulingEngine};
use agenda_events::EventBus;

pub const ORG_ID: DbId = 500;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        lock_timeout: Duration::from_millis(500),
        max_retries: 3,
        retry_backoff: Duration::from_millis(5),
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub bus: Arc<EventBus>,
    pub engine: Arc<SchedulingEngine>,
    pub member: Member,
}

impl Fixture {
    pub fn engine_with(&self, config: EngineConfig) -> SchedulingEngine {
        SchedulingEngine::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::clone(&self.bus),
            config,
        )
    }
}

/// Organization open Monday 08:00-18:00; member "Ana" overrides Monday with
/// 09:00-17:00 and a 13:00-14:00 break.
pub fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let member = store.add_member(ORG_ID, "Ana");

    store
        .add_weekly_rule(&weekly(ScheduleScope::Organization, ORG_ID, 1, (8, 18), None))
        .unwrap();
    store
        .add_weekly_rule(&weekly(
            ScheduleScope::Member,
            member.id,
            1,
            (9, 17),
            Some((13, 14)),
        ))
        .unwrap();

    let bus = Arc::new(EventBus::default());
    let engine = Arc::new(SchedulingEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(&bus),
        fast_config(),
    ));

    Fixture {
        store,
        bus,
        engine,
        member,
    }
}

pub fn weekly(
    scope: ScheduleScope,
    owner_id: DbId,
    day_of_week: i16,
    (start, end): (u32, u32),
    break_hours: Option<(u32, u32)>,
) -> CreateWeeklyRule {
    CreateWeeklyRule {
        scope,
        owner_id,
        day_of_week,
        start_time: t(start, 0),
        end_time: t(end, 0),
        break_start: break_hours.map(|(b, _)| t(b, 0)),
        break_end: break_hours.map(|(_, b)| t(b, 0)),
        is_available: true,
    }
}

pub fn closed_on(scope: ScheduleScope, owner_id: DbId, date: NaiveDate) -> CreateSpecialDate {
    CreateSpecialDate {
        scope,
        owner_id,
        special_date: date,
        start_time: None,
        end_time: None,
        break_start: None,
        break_end: None,
        is_available: false,
        reason: Some("Feriado".to_string()),
    }
}

pub fn open_on(
    scope: ScheduleScope,
    owner_id: DbId,
    date: NaiveDate,
    (start, end): (u32, u32),
) -> CreateSpecialDate {
    CreateSpecialDate {
        scope,
        owner_id,
        special_date: date,
        start_time: Some(t(start, 0)),
        end_time: Some(t(end, 0)),
        break_start: None,
        break_end: None,
        is_available: true,
        reason: None,
    }
}

pub fn request(member_id: DbId, start: NaiveTime, end: NaiveTime) -> BookingRequest {
    BookingRequest {
        member_id,
        contact_id: 900,
        service_id: None,
        date: monday(),
        start_time: start,
        end_time: Some(end),
        notes: None,
    }
}
