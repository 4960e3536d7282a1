//! Handlers for weekly rules and special-date exceptions.
//!
//! Input is checked by `agenda_core::schedule` before it reaches the
//! repositories; duplicates per `(scope, owner, day)` surface as 409 from
//! the unique constraints. Changes take effect on the next resolution since
//! nothing is cached.

use agenda_core::error::CoreError;
use agenda_core::schedule::{validate_weekly_rule, ScheduleScope};
use agenda_core::types::DbId;
use agenda_db::models::schedule::{
    CreateSpecialDate, CreateWeeklyRule, SpecialDate, UpdateWeeklyRule, WeeklyRule,
};
use agenda_db::repositories::{SpecialDateRepo, WeeklyRuleRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ScheduleOwnerQuery {
    pub scope: ScheduleScope,
    #[validate(range(min = 1))]
    pub owner_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SpecialDateQuery {
    pub scope: ScheduleScope,
    #[validate(range(min = 1))]
    pub owner_id: DbId,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Weekly rules
// ---------------------------------------------------------------------------

/// GET /api/v1/schedules/weekly-rules?scope=&owner_id=
pub async fn list_weekly_rules(
    State(state): State<AppState>,
    Query(params): Query<ScheduleOwnerQuery>,
) -> AppResult<Json<DataResponse<Vec<WeeklyRule>>>> {
    params.validate()?;
    let rules = WeeklyRuleRepo::list_for_owner(&state.pool, params.scope, params.owner_id).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /api/v1/schedules/weekly-rules
pub async fn create_weekly_rule(
    State(state): State<AppState>,
    Json(input): Json<CreateWeeklyRule>,
) -> AppResult<(StatusCode, Json<DataResponse<WeeklyRule>>)> {
    input.validate_schedule()?;
    let rule = WeeklyRuleRepo::create(&state.pool, &input).await?;
    tracing::info!(
        rule_id = rule.id,
        scope = %rule.scope,
        owner_id = rule.owner_id,
        day_of_week = rule.day_of_week,
        "Weekly rule created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// PUT /api/v1/schedules/weekly-rules/{id}
///
/// Replaces the hours of a rule; its scope, owner and weekday are fixed.
pub async fn update_weekly_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateWeeklyRule>,
) -> AppResult<Json<DataResponse<WeeklyRule>>> {
    let existing = WeeklyRuleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| weekly_rule_not_found(id))?;
    validate_weekly_rule(
        existing.day_of_week,
        input.start_time,
        input.end_time,
        input.break_start,
        input.break_end,
        input.is_available,
    )?;

    let rule = WeeklyRuleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| weekly_rule_not_found(id))?;
    tracing::info!(rule_id = id, "Weekly rule updated");
    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /api/v1/schedules/weekly-rules/{id}
pub async fn delete_weekly_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if WeeklyRuleRepo::delete(&state.pool, id).await? {
        tracing::info!(rule_id = id, "Weekly rule deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(weekly_rule_not_found(id))
    }
}

// ---------------------------------------------------------------------------
// Special dates
// ---------------------------------------------------------------------------

/// GET /api/v1/schedules/special-dates?scope=&owner_id=&from=&to=
pub async fn list_special_dates(
    State(state): State<AppState>,
    Query(params): Query<SpecialDateQuery>,
) -> AppResult<Json<DataResponse<Vec<SpecialDate>>>> {
    params.validate()?;
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(AppError::BadRequest(format!(
                "from ({from}) must not be after to ({to})"
            )));
        }
    }

    let dates = SpecialDateRepo::list_for_owner(
        &state.pool,
        params.scope,
        params.owner_id,
        params.from,
        params.to,
    )
    .await?;
    Ok(Json(DataResponse { data: dates }))
}

/// POST /api/v1/schedules/special-dates
pub async fn create_special_date(
    State(state): State<AppState>,
    Json(input): Json<CreateSpecialDate>,
) -> AppResult<(StatusCode, Json<DataResponse<SpecialDate>>)> {
    input.validate_schedule()?;
    let special = SpecialDateRepo::create(&state.pool, &input).await?;
    tracing::info!(
        special_date_id = special.id,
        scope = %special.scope,
        owner_id = special.owner_id,
        date = %special.special_date,
        is_available = special.is_available,
        "Special date created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: special })))
}

/// DELETE /api/v1/schedules/special-dates/{id}
pub async fn delete_special_date(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if SpecialDateRepo::delete(&state.pool, id).await? {
        tracing::info!(special_date_id = id, "Special date deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "SpecialDate",
            id,
        }))
    }
}

fn weekly_rule_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "WeeklyRule",
        id,
    })
}
