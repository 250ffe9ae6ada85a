use std::collections::HashSet;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AssignmentBoard, AssignmentInput, AssignmentView, CalendarEvent, CompletionStatus,
        FileView, SearchQuery,
    },
    repo_types::{Assignment, AssignmentFile},
    services::{self, normalize_keywords, NewFile},
};
use crate::{
    access::{self, Action, Actor, CourseFacts, ListScope, Target},
    auth::extractors::AuthUser,
    courses::repo_types::Course,
    error::{AppError, AppResult},
    state::AppState,
    storage::attachment_key,
};

const PRESIGN_SECONDS: u64 = 600;
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/assignments", get(list_assignments))
        .route("/assignments/search", get(search_assignments))
        .route("/assignments/:id/files/:file_id", get(download_file))
        .route("/calendar/events", get(calendar_events))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/assignments", post(create_assignment))
        .route(
            "/assignments/:id",
            put(edit_assignment).delete(delete_assignment),
        )
        .route("/assignments/:id/toggle-complete", post(toggle_complete))
        .route(
            "/assignments/:id/files/:file_id",
            axum::routing::delete(delete_file),
        )
        .route(
            "/assignments/:id/files",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

async fn load_assignment(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
) -> AppResult<(Assignment, CourseFacts)> {
    let assignment = Assignment::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Assignment not found"))?;
    let (_, facts) =
        access::course_facts(state.enrollment.as_ref(), actor, assignment.course_id).await?;
    Ok((assignment, facts))
}

async fn visible_views(state: &AppState, actor: &Actor) -> AppResult<Vec<AssignmentView>> {
    let scope = ListScope::for_actor(actor);
    let rows = Assignment::list_visible(&state.db, scope, actor.user_id).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let files = AssignmentFile::for_assignments(&state.db, &ids).await?;
    let member_of: HashSet<Uuid> = Course::member_course_ids(&state.db, actor.user_id)
        .await?
        .into_iter()
        .collect();
    Ok(services::build_views(rows, files, actor, &member_of))
}

#[instrument(skip(state))]
pub async fn list_assignments(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<AssignmentBoard>> {
    let views = visible_views(&state, &actor).await?;
    Ok(Json(services::partition(views)))
}

#[instrument(skip(state))]
pub async fn search_assignments(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<AssignmentView>>> {
    let views = visible_views(&state, &actor).await?;
    Ok(Json(services::search(views, &query.q)))
}

#[instrument(skip(state))]
pub async fn calendar_events(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    let views = visible_views(&state, &actor).await?;
    Ok(Json(services::calendar_events(&views)))
}

#[instrument(skip(state, payload))]
pub async fn create_assignment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<AssignmentInput>,
) -> AppResult<(StatusCode, Json<Assignment>)> {
    let new = payload.validate()?;
    let (_, facts) =
        access::course_facts(state.enrollment.as_ref(), &actor, new.course_id).await?;
    access::authorize(
        &actor,
        Target::Assignment {
            course: &facts,
            owner_id: actor.user_id,
        },
        Action::Create,
    )?;

    let assignment = Assignment::create(&state.db, &new, actor.user_id).await?;
    info!(assignment_id = %assignment.id, course_id = %assignment.course_id, user_id = %actor.user_id, "assignment created");
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[instrument(skip(state, payload))]
pub async fn edit_assignment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentInput>,
) -> AppResult<Json<Assignment>> {
    let new = payload.validate()?;
    let (assignment, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(
        &actor,
        Target::Assignment {
            course: &facts,
            owner_id: assignment.owner_id,
        },
        Action::Edit,
    )?;

    // moving to another course requires membership there too
    if new.course_id != assignment.course_id {
        let (_, target) =
            access::course_facts(state.enrollment.as_ref(), &actor, new.course_id).await?;
        access::authorize(
            &actor,
            Target::Assignment {
                course: &target,
                owner_id: actor.user_id,
            },
            Action::Create,
        )?;
    }

    let updated = Assignment::update(&state.db, id, &new)
        .await?
        .ok_or_else(|| AppError::not_found("Assignment not found"))?;
    info!(assignment_id = %id, user_id = %actor.user_id, "assignment updated");
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let (assignment, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(
        &actor,
        Target::Assignment {
            course: &facts,
            owner_id: assignment.owner_id,
        },
        Action::Delete,
    )?;

    let keys = Assignment::delete(&state.db, id).await?;
    for key in &keys {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, %key, "failed to delete attachment blob");
        }
    }
    info!(assignment_id = %id, user_id = %actor.user_id, files = keys.len(), "assignment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn toggle_complete(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CompletionStatus>> {
    let (assignment, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(
        &actor,
        Target::Assignment {
            course: &facts,
            owner_id: assignment.owner_id,
        },
        Action::Complete,
    )?;

    let completed = Assignment::toggle_completion(&state.db, id, actor.user_id).await?;
    info!(assignment_id = %id, user_id = %actor.user_id, completed, "completion toggled");
    Ok(Json(CompletionStatus {
        assignment_id: id,
        completed,
    }))
}

struct Upload {
    body: Bytes,
    file_name: Option<String>,
    content_type: String,
}

/// Multipart fields: `file` (required), `title`, `description`, `keywords`.
#[instrument(skip(state, mp))]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> AppResult<(StatusCode, Json<FileView>)> {
    let (assignment, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(
        &actor,
        Target::Assignment {
            course: &facts,
            owner_id: assignment.owner_id,
        },
        Action::Edit,
    )?;

    let mut upload: Option<Upload> = None;
    let mut title = String::new();
    let mut description = String::new();
    let mut keywords = String::new();

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid file upload: {e}")))?;
                upload = Some(Upload {
                    body,
                    file_name,
                    content_type,
                });
            }
            "title" | "description" | "keywords" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Invalid field {name}: {e}")))?;
                match name.as_str() {
                    "title" => title = text,
                    "description" => description = text,
                    _ => keywords = text,
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::validation("file is required"))?;
    if upload.body.is_empty() {
        return Err(AppError::validation("Uploaded file is empty"));
    }

    let file_id = Uuid::new_v4();
    let storage_key = attachment_key(id, file_id, upload.file_name.as_deref());
    let title = match title.trim() {
        "" => upload.file_name.clone().unwrap_or_else(|| "attachment".into()),
        t => t.to_string(),
    };
    let new = NewFile {
        id: file_id,
        assignment_id: id,
        uploaded_by: actor.user_id,
        title,
        description: description.trim().to_string(),
        keywords: normalize_keywords(&keywords)?,
        storage_key: storage_key.clone(),
        content_type: upload.content_type.clone(),
    };

    state
        .storage
        .put_object(&storage_key, upload.body, &upload.content_type)
        .await?;

    let file = match AssignmentFile::create(&state.db, &new).await {
        Ok(f) => f,
        Err(e) => {
            // keep the bucket free of orphans
            if let Err(del) = state.storage.delete_object(&storage_key).await {
                warn!(error = %del, key = %storage_key, "failed to remove orphaned blob");
            }
            return Err(e.into());
        }
    };

    info!(assignment_id = %id, file_id = %file.id, user_id = %actor.user_id, "file attached");
    Ok((StatusCode::CREATED, Json(services::file_view(file))))
}

#[instrument(skip(state))]
pub async fn download_file(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((id, file_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Redirect> {
    let (_, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(&actor, Target::AssignmentFile { course: &facts }, Action::View)?;

    let file = AssignmentFile::find(&state.db, id, file_id)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;
    let url = state
        .storage
        .presign_get(&file.storage_key, PRESIGN_SECONDS)
        .await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((id, file_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let (_, facts) = load_assignment(&state, &actor, id).await?;
    access::authorize(&actor, Target::AssignmentFile { course: &facts }, Action::Delete)?;

    let key = AssignmentFile::delete(&state.db, id, file_id)
        .await?
        .ok_or_else(|| AppError::not_found("File not found"))?;
    if let Err(e) = state.storage.delete_object(&key).await {
        warn!(error = %e, %key, "failed to delete attachment blob");
    }
    info!(assignment_id = %id, %file_id, user_id = %actor.user_id, "file deleted");
    Ok(StatusCode::NO_CONTENT)
}
