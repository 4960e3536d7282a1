//! Repository for the `services` and `service_members` tables.

use sqlx::PgPool;

use agenda_core::types::DbId;

use crate::models::service::Service;

/// Service columns plus the aggregated member assignments.
const COLUMNS: &str = "s.id, s.organization_id, s.name, s.duration_minutes, s.is_active, \
    COALESCE(array_agg(sm.member_id ORDER BY sm.member_id) \
        FILTER (WHERE sm.member_id IS NOT NULL), '{}') AS assigned_member_ids, \
    s.created_at, s.updated_at";

/// Read access to services and their member assignments.
pub struct ServiceRepo;

impl ServiceRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Service>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM services s \
             LEFT JOIN service_members sm ON sm.service_id = s.id \
             WHERE s.id = $1 \
             GROUP BY s.id"
        );
        sqlx::query_as::<_, Service>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
