//! Service entity model.

use serde::Serialize;
use sqlx::FromRow;

use agenda_core::types::{DbId, Timestamp};

/// A row from the `services` table, joined with its member assignments.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,
    pub duration_minutes: i32,
    pub is_active: bool,
    /// Members allowed to perform the service. Empty means any member of
    /// the organization.
    pub assigned_member_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Service {
    pub fn is_assigned_to(&self, member_id: DbId) -> bool {
        self.assigned_member_ids.is_empty() || self.assigned_member_ids.contains(&member_id)
    }
}
