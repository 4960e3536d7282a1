pub mod appointments;
pub mod health;
pub mod members;
pub mod schedules;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /members/{id}/availability?date=                 resolve availability (GET)
///
/// /appointments?member_id=&date=                   list a member's day (GET), book (POST)
/// /appointments/{id}                               get, patch, delete
/// /appointments/{id}/time                          reschedule (PUT)
/// /appointments/{id}/status                        change status (PUT)
///
/// /schedules/weekly-rules?scope=&owner_id=         list, create
/// /schedules/weekly-rules/{id}                     update (PUT), delete
/// /schedules/special-dates?scope=&owner_id=&from=&to=   list, create
/// /schedules/special-dates/{id}                    delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/members", members::router())
        .nest("/appointments", appointments::router())
        .nest("/schedules", schedules::router())
}
