pub mod policy;

pub use policy::{authorize, evaluate, Action, Actor, CourseFacts, Decision, ListScope, Target};

use uuid::Uuid;

use crate::{
    courses::repo_types::CourseRef,
    enrollment::store::EnrollmentStore,
    error::{AppError, AppResult},
};

/// Load the course and the actor's membership, 404 when the course does not exist.
pub async fn course_facts(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    course_id: Uuid,
) -> AppResult<(CourseRef, CourseFacts)> {
    let course = store
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let enrolled = if actor.is_anonymous() {
        false
    } else {
        store.is_enrolled(course_id, actor.user_id).await?
    };
    Ok((course, CourseFacts::new(&course, enrolled)))
}
