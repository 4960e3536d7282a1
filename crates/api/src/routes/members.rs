//! Route definitions for the `/members` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::availability;
use crate::state::AppState;

/// Routes mounted at `/members`.
///
/// ```text
/// GET    /{id}/availability     -> get_availability (?date=YYYY-MM-DD)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/availability", get(availability::get_availability))
}
