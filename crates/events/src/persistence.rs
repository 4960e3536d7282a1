//! Appointment event log.
//!
//! [`EventPersistence`] drains the queue handed out by
//! [`EventBus::attach_log`](crate::bus::EventBus::attach_log) into the
//! `events` table, where reminder and notification jobs pick appointment
//! changes up. An event is durable once its row is written; anything still
//! queued when the process dies is lost.

use tokio::sync::mpsc;

use agenda_core::types::DbId;
use agenda_db::repositories::EventRepo;
use agenda_db::DbPool;

use crate::bus::AgendaEvent;

pub struct EventPersistence;

impl EventPersistence {
    /// Record queued events until the bus is dropped and the queue is empty.
    pub async fn run(pool: DbPool, mut log: mpsc::UnboundedReceiver<AgendaEvent>) {
        let mut recorded: u64 = 0;
        while let Some(event) = log.recv().await {
            match Self::persist(&pool, &event).await {
                Ok(_) => recorded += 1,
                Err(e) => tracing::error!(
                    error = %e,
                    event_type = %event.event_type,
                    appointment_id = ?event.source_entity_id,
                    payload = %event.payload,
                    "Failed to record appointment event"
                ),
            }
        }
        tracing::info!(recorded, "Event log queue closed");
    }

    /// Insert one event row. Unknown event names fail with `RowNotFound`.
    pub async fn persist(pool: &DbPool, event: &AgendaEvent) -> Result<DbId, sqlx::Error> {
        let Some(event_type) = EventRepo::get_event_type_by_name(pool, &event.event_type).await?
        else {
            return Err(sqlx::Error::RowNotFound);
        };

        EventRepo::insert(
            pool,
            event_type.id,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            &event.payload,
        )
        .await
    }
}
