//! Availability resolution against a [`ScheduleStore`].
//!
//! Layers are queried lazily in precedence order; the first layer with a
//! record decides the day and lower layers are never read.

use std::sync::Arc;

use chrono::NaiveDate;

use agenda_core::availability::{Resolution, ScheduleLayer};
use agenda_core::error::CoreError;
use agenda_core::schedule::{day_of_week, DaySchedule, ScheduleScope};
use agenda_core::types::DbId;
use agenda_db::models::member::Member;

use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct AvailabilityResolver {
    store: Arc<dyn ScheduleStore>,
}

impl AvailabilityResolver {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Resolve availability for a member id.
    pub async fn resolve_member(
        &self,
        member_id: DbId,
        date: NaiveDate,
    ) -> Result<Resolution, CoreError> {
        let member = self
            .store
            .member(member_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Member",
                id: member_id,
            })?;
        self.resolve(&member, date).await
    }

    /// Resolve availability for an already loaded member.
    pub async fn resolve(&self, member: &Member, date: NaiveDate) -> Result<Resolution, CoreError> {
        for layer in ScheduleLayer::PRECEDENCE {
            if let Some(schedule) = self.lookup(layer, member, date).await? {
                tracing::debug!(member_id = member.id, %date, ?layer, "Availability resolved");
                return Ok(Resolution::governed(date, layer, &schedule));
            }
        }
        tracing::debug!(member_id = member.id, %date, "No schedule in any layer");
        Ok(Resolution::unscheduled(date))
    }

    async fn lookup(
        &self,
        layer: ScheduleLayer,
        member: &Member,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, CoreError> {
        let scope = layer.scope();
        let owner_id = match scope {
            ScheduleScope::Member => member.id,
            ScheduleScope::Organization => member.organization_id,
        };

        if layer.is_exception() {
            let Some(record) = self.store.special_date(scope, owner_id, date).await? else {
                return Ok(None);
            };
            record.day_schedule().map(Some).map_err(|e| {
                CoreError::Internal(format!("Stored special date {} is invalid: {e}", record.id))
            })
        } else {
            let Some(record) = self
                .store
                .weekly_rule(scope, owner_id, day_of_week(date))
                .await?
            else {
                return Ok(None);
            };
            record.day_schedule().map(Some).map_err(|e| {
                CoreError::Internal(format!("Stored weekly rule {} is invalid: {e}", record.id))
            })
        }
    }
}
