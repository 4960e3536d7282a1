//! Route definitions for schedule administration.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::schedules;
use crate::state::AppState;

/// Routes mounted at `/schedules`.
///
/// ```text
/// GET    /weekly-rules            -> list_weekly_rules (?scope=&owner_id=)
/// POST   /weekly-rules            -> create_weekly_rule
/// PUT    /weekly-rules/{id}       -> update_weekly_rule
/// DELETE /weekly-rules/{id}       -> delete_weekly_rule
/// GET    /special-dates           -> list_special_dates (?scope=&owner_id=&from=&to=)
/// POST   /special-dates           -> create_special_date
/// DELETE /special-dates/{id}      -> delete_special_date
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/weekly-rules",
            get(schedules::list_weekly_rules).post(schedules::create_weekly_rule),
        )
        .route(
            "/weekly-rules/{id}",
            put(schedules::update_weekly_rule).delete(schedules::delete_weekly_rule),
        )
        .route(
            "/special-dates",
            get(schedules::list_special_dates).post(schedules::create_special_date),
        )
        .route("/special-dates/{id}", delete(schedules::delete_special_date))
}
