//! Repository for the `weekly_rules` table.

use sqlx::PgPool;

use agenda_core::schedule::ScheduleScope;
use agenda_core::types::DbId;

use crate::models::schedule::{CreateWeeklyRule, UpdateWeeklyRule, WeeklyRule};

const COLUMNS: &str = "id, scope, owner_id, day_of_week, start_time, end_time, \
    break_start, break_end, is_available, created_at, updated_at";

/// CRUD for weekly recurring rules.
pub struct WeeklyRuleRepo;

impl WeeklyRuleRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WeeklyRule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM weekly_rules WHERE id = $1");
        sqlx::query_as::<_, WeeklyRule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The rule for one owner on one weekday, if any.
    pub async fn find_for_day(
        pool: &PgPool,
        scope: ScheduleScope,
        owner_id: DbId,
        day_of_week: i16,
    ) -> Result<Option<WeeklyRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM weekly_rules \
             WHERE scope = $1 AND owner_id = $2 AND day_of_week = $3"
        );
        sqlx::query_as::<_, WeeklyRule>(&query)
            .bind(scope.as_str())
            .bind(owner_id)
            .bind(day_of_week)
            .fetch_optional(pool)
            .await
    }

    /// All rules of one owner ordered by weekday.
    pub async fn list_for_owner(
        pool: &PgPool,
        scope: ScheduleScope,
        owner_id: DbId,
    ) -> Result<Vec<WeeklyRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM weekly_rules \
             WHERE scope = $1 AND owner_id = $2 \
             ORDER BY day_of_week"
        );
        sqlx::query_as::<_, WeeklyRule>(&query)
            .bind(scope.as_str())
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a rule. A second rule for the same (scope, owner, day) fails
    /// with a unique violation on `uq_weekly_rules_scope_owner_day`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWeeklyRule,
    ) -> Result<WeeklyRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO weekly_rules \
                (scope, owner_id, day_of_week, start_time, end_time, \
                 break_start, break_end, is_available) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WeeklyRule>(&query)
            .bind(input.scope.as_str())
            .bind(input.owner_id)
            .bind(input.day_of_week)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.break_start)
            .bind(input.break_end)
            .bind(input.is_available)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateWeeklyRule,
    ) -> Result<Option<WeeklyRule>, sqlx::Error> {
        let query = format!(
            "UPDATE weekly_rules SET \
                start_time = $2, end_time = $3, break_start = $4, break_end = $5, \
                is_available = $6, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WeeklyRule>(&query)
            .bind(id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.break_start)
            .bind(input.break_end)
            .bind(input.is_available)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM weekly_rules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
