//! In-process event bus.
//!
//! Live subscribers share a bounded `tokio::sync::broadcast` channel and may
//! lag. The durable log gets its own unbounded queue so that no event
//! published while it is attached is skipped. Publishing never waits.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use agenda_core::types::DbId;
use agenda_db::models::appointment::Appointment;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const APPOINTMENT_CREATED: &str = "appointment.created";
pub const APPOINTMENT_UPDATED: &str = "appointment.updated";
pub const APPOINTMENT_CANCELLED: &str = "appointment.cancelled";

/// Entity type recorded on appointment events.
pub const APPOINTMENT_ENTITY: &str = "appointment";

/// What happened to an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentEventKind {
    #[serde(rename = "appointment.created")]
    Created,
    #[serde(rename = "appointment.updated")]
    Updated,
    #[serde(rename = "appointment.cancelled")]
    Cancelled,
}

impl AppointmentEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => APPOINTMENT_CREATED,
            Self::Updated => APPOINTMENT_UPDATED,
            Self::Cancelled => APPOINTMENT_CANCELLED,
        }
    }
}

impl fmt::Display for AppointmentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AgendaEvent
// ---------------------------------------------------------------------------

/// A domain event as carried on the bus and stored in `events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaEvent {
    /// Dot-separated event name, e.g. `"appointment.created"`.
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AgendaEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Event for an appointment, with payload `{ event_type, appointment }`.
    pub fn appointment(kind: AppointmentEventKind, appointment: &Appointment) -> Self {
        let payload = serde_json::json!({
            "event_type": kind.as_str(),
            "appointment": appointment,
        });
        Self::new(kind.as_str())
            .with_source(APPOINTMENT_ENTITY, appointment.id)
            .with_payload(payload)
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus shared as `Arc<EventBus>`.
///
/// When the broadcast buffer is full the oldest unread events are dropped
/// for slow subscribers, who observe `RecvError::Lagged`. The log queue
/// attached with [`attach_log`](Self::attach_log) is not affected.
pub struct EventBus {
    sender: broadcast::Sender<AgendaEvent>,
    log: OnceLock<mpsc::UnboundedSender<AgendaEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            log: OnceLock::new(),
        }
    }

    /// Publish to the log queue and every live subscriber. Returns how many
    /// live subscribers received it.
    pub fn publish(&self, event: AgendaEvent) -> usize {
        if let Some(log) = self.log.get() {
            if log.send(event.clone()).is_err() {
                tracing::error!(
                    event_type = %event.event_type,
                    "Event log receiver is gone, event not recorded"
                );
            }
        }
        // An error only means nobody is subscribed.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgendaEvent> {
        self.sender.subscribe()
    }

    /// Queue every subsequent event for the durable log. Only one log may be
    /// attached; later calls return `None`. The queue closes when the bus is
    /// dropped.
    pub fn attach_log(&self) -> Option<mpsc::UnboundedReceiver<AgendaEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.log.set(tx).ok().map(|()| rx)
    }

    pub fn has_log(&self) -> bool {
        self.log.get().is_some_and(|log| !log.is_closed())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
