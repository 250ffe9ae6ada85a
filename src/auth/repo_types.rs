use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::role::Role;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub subject: String,                        // identity provider's stable id
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub role_selected_at: Option<OffsetDateTime>, // null until onboarding
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn needs_role(&self) -> bool {
        self.role_selected_at.is_none()
    }
}
