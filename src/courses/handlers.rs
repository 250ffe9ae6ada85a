use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CourseDetails, CourseList, CourseSummary, CreateCourseInput, EditDescriptionInput, MemberView},
    repo::DescriptionUpdate,
    repo_types::Course,
    services::partition_courses,
};
use crate::{
    access::{self, evaluate, Action, Actor, Target},
    auth::{
        extractors::{AuthUser, MaybeAuthUser},
        repo_types::User,
    },
    enrollment::workflow::EnrollmentState,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:id",
            get(get_course).patch(edit_course).delete(delete_course),
        )
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
) -> AppResult<Json<CourseList>> {
    let courses = Course::list_all(&state.db).await?;
    let member_of = if actor.is_anonymous() {
        Vec::new()
    } else {
        Course::member_course_ids(&state.db, actor.user_id).await?
    };
    Ok(Json(partition_courses(&courses, &actor, &member_of)))
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateCourseInput>,
) -> AppResult<(StatusCode, Json<CourseSummary>)> {
    let new = payload.validate()?;
    let course = Course::create(&state.db, &new, actor.user_id)
        .await?
        .ok_or_else(|| {
            AppError::validation(format!(
                "The course '{} {}' with this description already exists",
                new.signature.name, new.signature.number
            ))
        })?;

    info!(course_id = %course.id, user_id = %actor.user_id, full_name = %course.full_name(), "course created");
    Ok((StatusCode::CREATED, Json(CourseSummary::from(&course))))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<CourseDetails>> {
    let store = state.enrollment.as_ref();
    let (_, facts) = access::course_facts(store, &actor, course_id).await?;
    access::authorize(&actor, Target::Course(&facts), Action::View)?;

    let course = Course::find(&state.db, course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let request = store.find_request(course_id, actor.user_id).await?;
    let enrollment =
        EnrollmentState::derive(facts.is_creator(&actor), facts.enrolled, request.map(|r| r.status));

    let members = if facts.is_member(&actor) {
        Course::members(&state.db, course_id)
            .await?
            .into_iter()
            .map(|m| MemberView {
                id: m.id,
                display_name: m.display_name,
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Json(CourseDetails {
        course: CourseSummary::from(&course),
        enrollment,
        can_edit: evaluate(&actor, Target::Course(&facts), Action::Edit).is_allowed(),
        can_delete: evaluate(&actor, Target::Course(&facts), Action::Delete).is_allowed(),
        members,
    }))
}

#[instrument(skip(state, payload))]
pub async fn edit_course(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<EditDescriptionInput>,
) -> AppResult<Json<CourseSummary>> {
    let (_, facts) = access::course_facts(state.enrollment.as_ref(), &actor, course_id).await?;
    access::authorize(&actor, Target::Course(&facts), Action::Edit)?;

    let description = payload.validate()?;
    let course = match Course::update_description(&state.db, course_id, &description).await? {
        DescriptionUpdate::Updated(course) => course,
        DescriptionUpdate::Duplicate => {
            return Err(AppError::validation(
                "A course with the same name, number and description already exists",
            ))
        }
        DescriptionUpdate::Missing => return Err(AppError::not_found("Course not found")),
    };

    info!(%course_id, user_id = %actor.user_id, "course description updated");
    Ok(Json(CourseSummary::from(&course)))
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(course_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let (_, facts) = access::course_facts(state.enrollment.as_ref(), &actor, course_id).await?;

    // admin rights come from the token; confirm they still hold
    let actor = if actor.is_admin() && !facts.is_creator(&actor) {
        let role = User::current_role(&state.db, actor.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User no longer exists".into()))?;
        Actor::new(actor.user_id, role)
    } else {
        actor
    };
    access::authorize(&actor, Target::Course(&facts), Action::Delete)?;

    let keys = Course::delete_cascade(&state.db, course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    // blobs go after the commit; a leftover object is harmless
    for key in &keys {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, %key, "failed to delete attachment blob");
        }
    }

    info!(%course_id, user_id = %actor.user_id, files = keys.len(), "course deleted");
    Ok(StatusCode::NO_CONTENT)
}
