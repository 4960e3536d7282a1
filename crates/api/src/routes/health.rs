use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when bookings cannot be taken.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether appointment events are being written to the event log.
    pub event_log_attached: bool,
}

/// GET /health
///
/// Booking needs the database; a missing event log only loses
/// notifications, so it is reported without degrading the status.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = agenda_db::health_check(&state.pool).await.is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        event_log_attached: state.event_bus.has_log(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
