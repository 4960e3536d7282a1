//! Repository for the `special_dates` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use agenda_core::schedule::ScheduleScope;
use agenda_core::types::DbId;

use crate::models::schedule::{CreateSpecialDate, SpecialDate};

const COLUMNS: &str = "id, scope, owner_id, special_date, start_time, end_time, \
    break_start, break_end, is_available, reason, created_at, updated_at";

/// CRUD for date-specific exceptions.
pub struct SpecialDateRepo;

impl SpecialDateRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SpecialDate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM special_dates WHERE id = $1");
        sqlx::query_as::<_, SpecialDate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The exception for one owner on one date, if any.
    pub async fn find_for_date(
        pool: &PgPool,
        scope: ScheduleScope,
        owner_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<SpecialDate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM special_dates \
             WHERE scope = $1 AND owner_id = $2 AND special_date = $3"
        );
        sqlx::query_as::<_, SpecialDate>(&query)
            .bind(scope.as_str())
            .bind(owner_id)
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// Exceptions of one owner, optionally bounded to `[from, to]`, ordered
    /// by date.
    pub async fn list_for_owner(
        pool: &PgPool,
        scope: ScheduleScope,
        owner_id: DbId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SpecialDate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM special_dates \
             WHERE scope = $1 AND owner_id = $2 \
               AND ($3::date IS NULL OR special_date >= $3) \
               AND ($4::date IS NULL OR special_date <= $4) \
             ORDER BY special_date"
        );
        sqlx::query_as::<_, SpecialDate>(&query)
            .bind(scope.as_str())
            .bind(owner_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Insert an exception. A duplicate (scope, owner, date) fails with a
    /// unique violation on `uq_special_dates_scope_owner_date`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSpecialDate,
    ) -> Result<SpecialDate, sqlx::Error> {
        let query = format!(
            "INSERT INTO special_dates \
                (scope, owner_id, special_date, start_time, end_time, \
                 break_start, break_end, is_available, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpecialDate>(&query)
            .bind(input.scope.as_str())
            .bind(input.owner_id)
            .bind(input.special_date)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.break_start)
            .bind(input.break_end)
            .bind(input.is_available)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM special_dates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
