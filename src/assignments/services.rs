use std::collections::{HashMap, HashSet};

use time::Date;
use uuid::Uuid;

use super::{
    dto::{AssignmentBoard, AssignmentInput, AssignmentView, CalendarEvent, FileView},
    repo_types::{AssignmentFile, AssignmentListRow},
};
use crate::{
    access::Actor,
    error::{AppError, AppResult},
};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_KEYWORDS_LEN: usize = 255;

/// Assignment fields that passed validation.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Date,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub uploaded_by: Uuid,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub storage_key: String,
    pub content_type: String,
}

impl AssignmentInput {
    pub fn validate(&self) -> AppResult<NewAssignment> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::validation(format!(
                "Title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        Ok(NewAssignment {
            course_id: self.course_id,
            title: title.to_string(),
            description: self.description.trim().to_string(),
            due_date: self.due_date,
        })
    }
}

/// Comma-separated tags, trimmed, empties dropped.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical stored form of a keyword list.
pub fn normalize_keywords(raw: &str) -> AppResult<String> {
    let joined = split_keywords(raw).join(", ");
    if joined.chars().count() > MAX_KEYWORDS_LEN {
        return Err(AppError::validation(format!(
            "Keywords must be at most {MAX_KEYWORDS_LEN} characters"
        )));
    }
    Ok(joined)
}

/// Case-insensitive substring match of `query` against any keyword. An empty
/// query matches everything.
pub fn matches_query(keywords: &[String], query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    keywords.iter().any(|k| k.to_lowercase().contains(&query))
}

pub fn file_view(file: AssignmentFile) -> FileView {
    FileView {
        download_url: format!("/api/v1/assignments/{}/files/{}", file.assignment_id, file.id),
        keywords: split_keywords(&file.keywords),
        id: file.id,
        title: file.title,
        description: file.description,
        content_type: file.content_type,
        uploaded_by: file.uploaded_by,
        uploaded_at: file.uploaded_at,
    }
}

/// Attach files to their rows. `member_of` holds the courses the actor is a
/// member of; it decides `can_edit`.
pub fn build_views(
    rows: Vec<AssignmentListRow>,
    files: Vec<AssignmentFile>,
    actor: &Actor,
    member_of: &HashSet<Uuid>,
) -> Vec<AssignmentView> {
    let mut by_assignment: HashMap<Uuid, Vec<FileView>> = HashMap::new();
    for file in files {
        by_assignment
            .entry(file.assignment_id)
            .or_default()
            .push(file_view(file));
    }
    rows.into_iter()
        .map(|r| AssignmentView {
            can_edit: r.owner_id == actor.user_id && member_of.contains(&r.course_id),
            files: by_assignment.remove(&r.id).unwrap_or_default(),
            course: format!("{} {}", r.course_name, r.course_number),
            id: r.id,
            course_id: r.course_id,
            owner_id: r.owner_id,
            title: r.title,
            description: r.description,
            due_date: r.due_date,
            completed: r.completed,
        })
        .collect()
}

/// Keep assignments with at least one file whose keywords match.
pub fn search(views: Vec<AssignmentView>, query: &str) -> Vec<AssignmentView> {
    if query.trim().is_empty() {
        return views;
    }
    views
        .into_iter()
        .filter(|v| v.files.iter().any(|f| matches_query(&f.keywords, query)))
        .collect()
}

pub fn partition(views: Vec<AssignmentView>) -> AssignmentBoard {
    let (completed, in_progress) = views.into_iter().partition(|v| v.completed);
    AssignmentBoard {
        in_progress,
        completed,
    }
}

pub fn calendar_events(views: &[AssignmentView]) -> Vec<CalendarEvent> {
    views
        .iter()
        .map(|v| CalendarEvent {
            id: v.id,
            title: format!("{}: {}", v.course, v.title),
            start: v.due_date,
            course: v.course.clone(),
            completed: v.completed,
            url: format!("/api/v1/assignments/{}", v.id),
        })
        .collect()
}
