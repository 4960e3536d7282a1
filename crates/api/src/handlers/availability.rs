use agenda_core::availability::Resolution;
use agenda_core::types::DbId;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

/// GET /api/v1/members/{id}/availability?date=YYYY-MM-DD
///
/// Bookable intervals of the member on the date, plus the layer that
/// governed the answer. An empty interval list means closed.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(member_id): Path<DbId>,
    Query(params): Query<AvailabilityQuery>,
) -> AppResult<Json<DataResponse<Resolution>>> {
    let resolution = state
        .engine
        .resolve_availability(member_id, params.date)
        .await?;
    Ok(Json(DataResponse { data: resolution }))
}
