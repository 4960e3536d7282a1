//! Route definitions for the `/appointments` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::appointments;
use crate::state::AppState;

/// Routes mounted at `/appointments`.
///
/// ```text
/// GET    /               -> list_appointments (?member_id=&date=)
/// POST   /               -> book_appointment
/// GET    /{id}           -> get_appointment
/// PATCH  /{id}           -> update_appointment
/// DELETE /{id}           -> delete_appointment
/// PUT    /{id}/time      -> update_appointment_time
/// PUT    /{id}/status    -> change_appointment_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(appointments::list_appointments).post(appointments::book_appointment),
        )
        .route(
            "/{id}",
            get(appointments::get_appointment)
                .patch(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route("/{id}/time", put(appointments::update_appointment_time))
        .route("/{id}/status", put(appointments::change_appointment_status))
}
