use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Discussion {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Discussion joined with names for listing.
#[derive(Debug, Clone, FromRow)]
pub struct DiscussionListRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_number: i32,
    pub author_id: Uuid,
    pub author_name: String,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub comment_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
