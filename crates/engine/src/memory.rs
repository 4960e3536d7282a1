//! In-memory store for tests and local development.
//!
//! Mirrors the PostgreSQL semantics the engine relies on: a per-(member,
//! date) async mutex stands in for the advisory lock (with the same bounded
//! wait), transaction writes are staged and applied only on commit, and
//! commit re-checks overlaps the way the exclusion constraint does.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;

use agenda_core::appointment_status::AppointmentStatus;
use agenda_core::error::CoreError;
use agenda_core::schedule::ScheduleScope;
use agenda_core::types::{DbId, Timestamp};
use agenda_db::models::appointment::{Appointment, NewAppointment};
use agenda_db::models::member::Member;
use agenda_db::models::schedule::{CreateSpecialDate, CreateWeeklyRule, SpecialDate, WeeklyRule};
use agenda_db::models::service::Service;

use crate::store::{lock_order, AppointmentStore, DayTransaction, ScheduleStore};

type DayLocks = Mutex<HashMap<(DbId, NaiveDate), Arc<tokio::sync::Mutex<()>>>>;

#[derive(Default)]
struct MemoryData {
    members: HashMap<DbId, Member>,
    services: HashMap<DbId, Service>,
    weekly_rules: Vec<WeeklyRule>,
    special_dates: Vec<SpecialDate>,
    appointments: BTreeMap<DbId, Appointment>,
    last_id: DbId,
}

impl MemoryData {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
    day_locks: Arc<DayLocks>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn day_lock(&self, member_id: DbId, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.day_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry((member_id, date)).or_default())
    }

    /// Forget day locks nobody holds or waits on.
    fn prune_day_locks(&self, days: &[(DbId, NaiveDate)]) {
        let mut locks = self.day_locks.lock().unwrap_or_else(PoisonError::into_inner);
        for day in days {
            if locks.get(day).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(day);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub fn add_member(&self, organization_id: DbId, name: &str) -> Member {
        let mut data = self.write();
        let now = Utc::now();
        let member = Member {
            id: data.next_id(),
            organization_id,
            name: name.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        data.members.insert(member.id, member.clone());
        member
    }

    pub fn set_member_active(&self, member_id: DbId, is_active: bool) {
        if let Some(member) = self.write().members.get_mut(&member_id) {
            member.is_active = is_active;
            member.updated_at = Utc::now();
        }
    }

    pub fn add_service(
        &self,
        organization_id: DbId,
        name: &str,
        duration_minutes: i32,
        assigned_member_ids: Vec<DbId>,
    ) -> Service {
        let mut data = self.write();
        let now = Utc::now();
        let service = Service {
            id: data.next_id(),
            organization_id,
            name: name.to_string(),
            duration_minutes,
            is_active: true,
            assigned_member_ids,
            created_at: now,
            updated_at: now,
        };
        data.services.insert(service.id, service.clone());
        service
    }

    pub fn set_service_active(&self, service_id: DbId, is_active: bool) {
        if let Some(service) = self.write().services.get_mut(&service_id) {
            service.is_active = is_active;
            service.updated_at = Utc::now();
        }
    }

    /// Store a validated weekly rule, enforcing one rule per (scope, owner, day).
    pub fn add_weekly_rule(&self, input: &CreateWeeklyRule) -> Result<WeeklyRule, CoreError> {
        input.validate_schedule()?;

        let mut data = self.write();
        let duplicate = data.weekly_rules.iter().any(|r| {
            r.scope == input.scope
                && r.owner_id == input.owner_id
                && r.day_of_week == input.day_of_week
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "A weekly rule already exists for {} {} on day {}",
                input.scope, input.owner_id, input.day_of_week
            )));
        }

        let now = Utc::now();
        let rule = WeeklyRule {
            id: data.next_id(),
            scope: input.scope,
            owner_id: input.owner_id,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            break_start: input.break_start,
            break_end: input.break_end,
            is_available: input.is_available,
            created_at: now,
            updated_at: now,
        };
        data.weekly_rules.push(rule.clone());
        Ok(rule)
    }

    /// Store a validated exception, enforcing one per (scope, owner, date).
    pub fn add_special_date(&self, input: &CreateSpecialDate) -> Result<SpecialDate, CoreError> {
        input.validate_schedule()?;

        let mut data = self.write();
        let duplicate = data.special_dates.iter().any(|d| {
            d.scope == input.scope
                && d.owner_id == input.owner_id
                && d.special_date == input.special_date
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "A special date already exists for {} {} on {}",
                input.scope, input.owner_id, input.special_date
            )));
        }

        let now = Utc::now();
        let exception = SpecialDate {
            id: data.next_id(),
            scope: input.scope,
            owner_id: input.owner_id,
            special_date: input.special_date,
            start_time: input.start_time,
            end_time: input.end_time,
            break_start: input.break_start,
            break_end: input.break_end,
            is_available: input.is_available,
            reason: input.reason.clone(),
            created_at: now,
            updated_at: now,
        };
        data.special_dates.push(exception.clone());
        Ok(exception)
    }
}

// ---------------------------------------------------------------------------
// ScheduleStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn member(&self, member_id: DbId) -> Result<Option<Member>, CoreError> {
        Ok(self.read().members.get(&member_id).cloned())
    }

    async fn service(&self, service_id: DbId) -> Result<Option<Service>, CoreError> {
        Ok(self.read().services.get(&service_id).cloned())
    }

    async fn weekly_rule(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        day_of_week: i16,
    ) -> Result<Option<WeeklyRule>, CoreError> {
        Ok(self
            .read()
            .weekly_rules
            .iter()
            .find(|r| r.scope == scope && r.owner_id == owner_id && r.day_of_week == day_of_week)
            .cloned())
    }

    async fn special_date(
        &self,
        scope: ScheduleScope,
        owner_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<SpecialDate>, CoreError> {
        Ok(self
            .read()
            .special_dates
            .iter()
            .find(|d| d.scope == scope && d.owner_id == owner_id && d.special_date == date)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// AppointmentStore
// ---------------------------------------------------------------------------

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn find(&self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        Ok(self.read().appointments.get(&id).cloned())
    }

    async fn list_day(
        &self,
        member_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, CoreError> {
        let data = self.read();
        Ok(day_view(data.appointments.values(), member_id, date, false))
    }

    async fn begin_days(
        &self,
        days: &[(DbId, NaiveDate)],
        lock_timeout: Duration,
    ) -> Result<Box<dyn DayTransaction>, CoreError> {
        let days = lock_order(days);
        // Built up front so a timeout part way still releases and prunes.
        let mut tx = MemoryDayTransaction {
            store: self.clone(),
            staged: BTreeMap::new(),
            expected: HashMap::new(),
            guards: Vec::with_capacity(days.len()),
            days: days.clone(),
        };
        for (member_id, date) in days {
            let lock = self.day_lock(member_id, date);
            let guard = tokio::time::timeout(lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    CoreError::Concurrency("Timed out waiting for the booking lock".to_string())
                })?;
            tx.guards.push(guard);
        }

        Ok(Box::new(tx))
    }

    async fn transition_status(
        &self,
        id: DbId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError> {
        let mut data = self.write();
        match data.appointments.get_mut(&id) {
            Some(appointment) if appointment.status == from => {
                appointment.status = to;
                appointment.updated_at = Utc::now();
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        Ok(self.write().appointments.remove(&id))
    }
}

// ---------------------------------------------------------------------------
// Day transaction
// ---------------------------------------------------------------------------

struct MemoryDayTransaction {
    store: MemoryStore,
    /// Writes visible to this transaction only, keyed by appointment id.
    staged: BTreeMap<DbId, Appointment>,
    /// Committed version each updated row must still have at commit.
    expected: HashMap<DbId, (AppointmentStatus, Timestamp)>,
    guards: Vec<OwnedMutexGuard<()>>,
    days: Vec<(DbId, NaiveDate)>,
}

impl MemoryDayTransaction {
    fn lookup(&self, id: DbId) -> Option<Appointment> {
        self.staged
            .get(&id)
            .cloned()
            .or_else(|| self.store.read().appointments.get(&id).cloned())
    }
}

#[async_trait]
impl DayTransaction for MemoryDayTransaction {
    async fn appointment(&mut self, id: DbId) -> Result<Option<Appointment>, CoreError> {
        Ok(self.lookup(id))
    }

    async fn appointments(
        &mut self,
        member_id: DbId,
        date: NaiveDate,
        exclude_cancelled: bool,
    ) -> Result<Vec<Appointment>, CoreError> {
        let data = self.store.read();
        let committed = data
            .appointments
            .values()
            .filter(|a| !self.staged.contains_key(&a.id));
        Ok(day_view(
            committed.chain(self.staged.values()),
            member_id,
            date,
            exclude_cancelled,
        ))
    }

    async fn insert(&mut self, input: &NewAppointment) -> Result<Appointment, CoreError> {
        input.interval()?;
        let id = self.store.write().next_id();
        let now = Utc::now();
        let appointment = materialize(id, input, now, now);
        self.staged.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn update(
        &mut self,
        expected: &Appointment,
        input: &NewAppointment,
    ) -> Result<Option<Appointment>, CoreError> {
        input.interval()?;
        let id = expected.id;
        let Some(existing) = self.lookup(id) else {
            return Ok(None);
        };
        if existing.status != expected.status || existing.updated_at != expected.updated_at {
            return Ok(None);
        }
        if !self.staged.contains_key(&id) {
            self.expected.insert(id, (existing.status, existing.updated_at));
        }
        let appointment = materialize(id, input, existing.created_at, Utc::now());
        self.staged.insert(id, appointment.clone());
        Ok(Some(appointment))
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let mut data = self.store.write();

        // Status changes take no day lock and may have landed since update.
        for (id, (status, updated_at)) in &self.expected {
            let unchanged = data
                .appointments
                .get(id)
                .is_some_and(|a| a.status == *status && a.updated_at == *updated_at);
            if !unchanged {
                return Err(CoreError::Concurrency(format!(
                    "Appointment {id} changed concurrently"
                )));
            }
        }

        for staged in self.staged.values().filter(|a| a.status.occupies_slot()) {
            let window = staged.interval()?;
            let collides = data
                .appointments
                .values()
                .filter(|a| !self.staged.contains_key(&a.id))
                .chain(self.staged.values())
                .filter(|a| a.id != staged.id)
                .filter(|a| a.member_id == staged.member_id)
                .filter(|a| a.appointment_date == staged.appointment_date)
                .filter(|a| a.status.occupies_slot())
                .any(|a| a.interval().is_ok_and(|other| other.overlaps(&window)));
            if collides {
                return Err(CoreError::Concurrency(
                    "An overlapping appointment was committed concurrently".to_string(),
                ));
            }
        }

        for (id, appointment) in &self.staged {
            data.appointments.insert(*id, appointment.clone());
        }
        Ok(())
    }
}

impl Drop for MemoryDayTransaction {
    fn drop(&mut self) {
        self.guards.clear();
        self.store.prune_day_locks(&self.days);
    }
}

fn materialize(
    id: DbId,
    input: &NewAppointment,
    created_at: Timestamp,
    updated_at: Timestamp,
) -> Appointment {
    Appointment {
        id,
        member_id: input.member_id,
        contact_id: input.contact_id,
        service_id: input.service_id,
        appointment_date: input.appointment_date,
        start_time: input.start_time,
        end_time: input.end_time,
        status: input.status,
        notes: input.notes.clone(),
        created_at,
        updated_at,
    }
}

/// One member's day, ordered by start time then id.
fn day_view<'a>(
    appointments: impl Iterator<Item = &'a Appointment>,
    member_id: DbId,
    date: NaiveDate,
    exclude_cancelled: bool,
) -> Vec<Appointment> {
    let mut day: Vec<Appointment> = appointments
        .filter(|a| a.member_id == member_id && a.appointment_date == date)
        .filter(|a| !exclude_cancelled || a.status != AppointmentStatus::Cancelled)
        .cloned()
        .collect();
    day.sort_by_key(|a| (a.start_time, a.id));
    day
}
