use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{
        CommentView, CreateCommentInput, CreateDiscussionInput, DiscussionDetails,
        DiscussionSummary, ListQuery,
    },
    repo_types::Discussion,
};
use crate::{
    access::{self, Action, ListScope, Target},
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/discussions", get(list_discussions).post(create_discussion))
        .route("/discussions/:id", get(get_discussion))
        .route("/discussions/:id/comments", post(add_comment))
}

#[instrument(skip(state))]
pub async fn list_discussions(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<DiscussionSummary>>> {
    let scope = ListScope::for_actor(&actor);
    let rows = Discussion::list_visible(&state.db, scope, query.course).await?;
    Ok(Json(rows.into_iter().map(DiscussionSummary::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_discussion(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateDiscussionInput>,
) -> AppResult<(StatusCode, Json<DiscussionDetails>)> {
    let (title, content) = payload.validate()?;
    let (_, facts) =
        access::course_facts(state.enrollment.as_ref(), &actor, payload.course_id).await?;
    access::authorize(&actor, Target::Discussion { course: &facts }, Action::Create)?;

    let discussion =
        Discussion::create(&state.db, payload.course_id, actor.user_id, &title, &content).await?;
    info!(discussion_id = %discussion.id, course_id = %discussion.course_id, user_id = %actor.user_id, "discussion created");
    Ok((
        StatusCode::CREATED,
        Json(DiscussionDetails::new(discussion, Vec::new())),
    ))
}

#[instrument(skip(state))]
pub async fn get_discussion(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DiscussionDetails>> {
    let discussion = Discussion::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Discussion not found"))?;
    let (_, facts) =
        access::course_facts(state.enrollment.as_ref(), &actor, discussion.course_id).await?;
    access::authorize(&actor, Target::Discussion { course: &facts }, Action::View)?;

    let comments = Discussion::comments(&state.db, id).await?;
    Ok(Json(DiscussionDetails::new(discussion, comments)))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentInput>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let content = payload.validate()?;
    let discussion = Discussion::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Discussion not found"))?;
    let (_, facts) =
        access::course_facts(state.enrollment.as_ref(), &actor, discussion.course_id).await?;
    access::authorize(&actor, Target::Discussion { course: &facts }, Action::Post)?;

    let comment = Discussion::add_comment(&state.db, id, actor.user_id, &content).await?;
    info!(discussion_id = %id, comment_id = %comment.id, user_id = %actor.user_id, "comment posted");
    Ok((StatusCode::CREATED, Json(CommentView::from(comment))))
}
