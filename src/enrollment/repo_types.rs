use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::workflow::EnrollmentStatus;

/// Enrollment request record; unique per (course, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EnrollmentRequest {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub status: EnrollmentStatus,
    pub request_date: OffsetDateTime,
    pub response_date: Option<OffsetDateTime>, // set on leaving PENDING
}
