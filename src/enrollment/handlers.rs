use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{MyRequests, PendingRequests},
    services::{self, EnrollmentOutcome, OutcomeKind},
    workflow::EnrollmentAction,
};
use crate::{auth::extractors::AuthUser, error::AppResult, state::AppState};

pub fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/courses/:id/enroll", post(enroll))
        .route("/courses/:id/unenroll", post(unenroll))
        .route("/courses/:id/request-enrollment", post(request_enrollment))
        .route("/courses/:id/enrollment-requests", get(pending_requests))
}

pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/enrollment-requests/:id/:action", post(decide))
        .route("/me/enrollment-requests", get(my_requests))
}

fn respond(outcome: EnrollmentOutcome) -> (StatusCode, Json<EnrollmentOutcome>) {
    let status = match outcome.kind {
        OutcomeKind::RequestCreated => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    (status, Json(outcome))
}

#[instrument(skip(state))]
pub async fn enroll(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<EnrollmentOutcome>)> {
    let outcome = services::direct_enroll(state.enrollment.as_ref(), &actor, course_id).await?;
    Ok(respond(outcome))
}

#[instrument(skip(state))]
pub async fn unenroll(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<EnrollmentOutcome>> {
    let outcome = services::unenroll(state.enrollment.as_ref(), &actor, course_id).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn request_enrollment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<EnrollmentOutcome>)> {
    let outcome =
        services::request_enrollment(state.enrollment.as_ref(), &actor, course_id).await?;
    Ok(respond(outcome))
}

#[instrument(skip(state))]
pub async fn pending_requests(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<PendingRequests>> {
    let requests =
        services::pending_requests(state.enrollment.as_ref(), &actor, course_id).await?;
    Ok(Json(PendingRequests {
        course_id,
        requests,
    }))
}

#[instrument(skip(state))]
pub async fn decide(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path((request_id, action)): Path<(Uuid, String)>,
) -> AppResult<Json<EnrollmentOutcome>> {
    let action: EnrollmentAction = action.parse()?;
    let outcome =
        services::decide_enrollment(state.enrollment.as_ref(), &actor, request_id, action).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn my_requests(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> AppResult<Json<MyRequests>> {
    let requests = services::my_requests(state.enrollment.as_ref(), &actor).await?;
    Ok(Json(MyRequests { requests }))
}
