use std::sync::Arc;

use agenda_engine::SchedulingEngine;
use agenda_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by schedule administration.
    pub pool: agenda_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Bus the engine publishes appointment events to.
    pub event_bus: Arc<EventBus>,
    /// Availability resolution and booking.
    pub engine: Arc<SchedulingEngine>,
}
