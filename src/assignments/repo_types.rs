use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub course_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Date,
    pub created_at: OffsetDateTime,
}

/// Assignment joined with its course name and the caller's completion marker.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentListRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_number: i32,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Date,
    pub created_at: OffsetDateTime,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct AssignmentFile {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub uploaded_by: Uuid,
    pub title: String,
    pub description: String,
    pub keywords: String, // comma-separated
    pub storage_key: String,
    pub content_type: String,
    pub uploaded_at: OffsetDateTime,
}
