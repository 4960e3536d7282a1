//! Transaction-scoped advisory locks serializing bookings per (member, date).
//!
//! The lock is released automatically when the enclosing transaction commits
//! or rolls back. `lock_timeout` bounds the wait; on expiry Postgres raises
//! SQLSTATE `55P03`, which callers classify as contention.

use std::time::Duration;

use chrono::NaiveDate;
use sqlx::PgConnection;

use agenda_core::booking::booking_lock_key;
use agenda_core::types::DbId;

/// Take the booking lock for `member_id` on `date` inside the current
/// transaction, waiting at most `timeout`.
pub async fn lock_member_day(
    conn: &mut PgConnection,
    member_id: DbId,
    date: NaiveDate,
    timeout: Duration,
) -> Result<(), sqlx::Error> {
    // `true` scopes the setting to the current transaction, like SET LOCAL.
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", timeout.as_millis()))
        .execute(&mut *conn)
        .await?;

    let key = booking_lock_key(member_id, date);
    tracing::debug!(member_id, %date, key, "Acquiring booking lock");

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
