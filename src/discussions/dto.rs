use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{CommentRow, Discussion, DiscussionListRow};
use crate::error::{AppError, AppResult};

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub course: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDiscussionInput {
    pub course_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentInput {
    pub content: String,
}

impl CreateDiscussionInput {
    /// Trimmed `(title, content)`.
    pub fn validate(&self) -> AppResult<(String, String)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "Title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::validation("Content is required"));
        }
        Ok((title.to_string(), content.to_string()))
    }
}

impl CreateCommentInput {
    pub fn validate(&self) -> AppResult<String> {
        match self.content.trim() {
            "" => Err(AppError::validation("Comment cannot be empty")),
            c => Ok(c.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscussionSummary {
    pub id: Uuid,
    pub course_id: Uuid,
    pub course: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub comment_count: i64,
}

impl From<DiscussionListRow> for DiscussionSummary {
    fn from(r: DiscussionListRow) -> Self {
        Self {
            course: format!("{} {}", r.course_name, r.course_number),
            id: r.id,
            course_id: r.course_id,
            author_id: r.author_id,
            author_name: r.author_name,
            title: r.title,
            created_at: r.created_at,
            comment_count: r.comment_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub discussion_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<CommentRow> for CommentView {
    fn from(r: CommentRow) -> Self {
        Self {
            id: r.id,
            discussion_id: r.discussion_id,
            author_id: r.author_id,
            author_name: r.author_name,
            content: r.content,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiscussionDetails {
    pub id: Uuid,
    pub course_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Oldest first.
    pub comments: Vec<CommentView>,
}

impl DiscussionDetails {
    pub fn new(d: Discussion, comments: Vec<CommentRow>) -> Self {
        Self {
            id: d.id,
            course_id: d.course_id,
            author_id: d.author_id,
            title: d.title,
            content: d.content,
            created_at: d.created_at,
            updated_at: d.updated_at,
            comments: comments.into_iter().map(CommentView::from).collect(),
        }
    }
}
