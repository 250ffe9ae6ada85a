use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AssignmentInput {
    pub course_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Date,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub content_type: String,
    pub uploaded_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course: String,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Date,
    pub completed: bool,
    pub can_edit: bool,
    pub files: Vec<FileView>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentBoard {
    pub in_progress: Vec<AssignmentView>,
    pub completed: Vec<AssignmentView>,
}

#[derive(Debug, Serialize)]
pub struct CompletionStatus {
    pub assignment_id: Uuid,
    pub completed: bool,
}

/// One entry of the due-date calendar.
#[derive(Debug, Serialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start: Date,
    pub course: String,
    pub completed: bool,
    pub url: String,
}
