//! Repository for the `members` table.

use sqlx::PgPool;

use agenda_core::types::DbId;

use crate::models::member::Member;

const COLUMNS: &str = "id, organization_id, name, is_active, created_at, updated_at";

/// Read access to members. Members are managed outside the agenda.
pub struct MemberRepo;

impl MemberRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
