use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    repo_types::EnrollmentRequest,
    store::{EnrollmentStore, InsertOutcome},
    workflow::{transition, EnrollmentAction},
};
use crate::{
    access::{self, Action, Actor, CourseFacts, Target},
    courses::repo_types::Privacy,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Enrolled,
    AlreadyEnrolled,
    RequestCreated,
    RequestExists,
    Approved,
    Rejected,
    Unenrolled,
    NotEnrolled,
}

/// What a workflow operation did, with a message for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<EnrollmentRequest>,
}

impl EnrollmentOutcome {
    fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request: None,
        }
    }

    fn with_request(mut self, request: EnrollmentRequest) -> Self {
        self.request = Some(request);
        self
    }
}

/// Ask to join a private course. Idempotent per (course, user).
pub async fn request_enrollment(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    course_id: Uuid,
) -> AppResult<EnrollmentOutcome> {
    let (course, facts) = access::course_facts(store, actor, course_id).await?;

    if facts.is_creator(actor) {
        return Err(AppError::validation("You are the creator of this course"));
    }
    if facts.enrolled {
        return Err(AppError::validation("You are already enrolled in this course"));
    }
    if course.privacy == Privacy::Public {
        return Err(AppError::validation(
            "This course is public; enroll in it directly",
        ));
    }

    match store.insert_pending(course_id, actor.user_id).await? {
        InsertOutcome::Created(req) => {
            info!(request_id = %req.id, %course_id, user_id = %actor.user_id, "enrollment requested");
            Ok(
                EnrollmentOutcome::new(OutcomeKind::RequestCreated, "Enrollment request sent")
                    .with_request(req),
            )
        }
        InsertOutcome::Existing(req) => {
            let message = format!(
                "You already have an enrollment request for this course (status: {})",
                req.status
            );
            Ok(EnrollmentOutcome::new(OutcomeKind::RequestExists, message).with_request(req))
        }
    }
}

/// Approve or reject a pending request. Only the course creator may decide.
pub async fn decide_enrollment(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    request_id: Uuid,
    action: EnrollmentAction,
) -> AppResult<EnrollmentOutcome> {
    let req = store
        .find_request_by_id(request_id)
        .await?
        .ok_or_else(|| AppError::not_found("Enrollment request not found"))?;
    let course = store
        .find_course(req.course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    // membership is irrelevant to the decide rule
    let facts = CourseFacts::new(&course, false);
    if let Err(e) = access::authorize(actor, Target::EnrollmentRequest { course: &facts }, Action::Decide) {
        warn!(%request_id, user_id = %actor.user_id, "unauthorized enrollment decision");
        return Err(e);
    }

    transition(req.status, action)?;

    let resolved = store
        .resolve_pending(request_id, action)
        .await?
        .ok_or_else(|| AppError::conflict("Enrollment request was already decided"))?;

    info!(%request_id, course_id = %resolved.course_id, user_id = %resolved.user_id, status = %resolved.status, "enrollment request decided");
    let outcome = match action {
        EnrollmentAction::Approve => {
            EnrollmentOutcome::new(OutcomeKind::Approved, "Enrollment request approved")
        }
        EnrollmentAction::Reject => {
            EnrollmentOutcome::new(OutcomeKind::Rejected, "Enrollment request rejected")
        }
    };
    Ok(outcome.with_request(resolved))
}

/// Join a course. Public courses and the creator enroll directly; anyone else
/// asking for a private course gets a request instead.
pub async fn direct_enroll(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    course_id: Uuid,
) -> AppResult<EnrollmentOutcome> {
    let (course, facts) = access::course_facts(store, actor, course_id).await?;

    if facts.enrolled {
        return Ok(EnrollmentOutcome::new(
            OutcomeKind::AlreadyEnrolled,
            "You are already enrolled in this course",
        ));
    }

    if facts.is_creator(actor) || course.privacy == Privacy::Public {
        store.enroll(course_id, actor.user_id).await?;
        info!(%course_id, user_id = %actor.user_id, "enrolled");
        return Ok(EnrollmentOutcome::new(
            OutcomeKind::Enrolled,
            "Successfully enrolled in the course",
        ));
    }

    request_enrollment(store, actor, course_id).await
}

/// Leave a course. Requests are left untouched; a no-op when not enrolled.
pub async fn unenroll(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    course_id: Uuid,
) -> AppResult<EnrollmentOutcome> {
    store
        .find_course(course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;

    if store.unenroll(course_id, actor.user_id).await? {
        info!(%course_id, user_id = %actor.user_id, "unenrolled");
        Ok(EnrollmentOutcome::new(
            OutcomeKind::Unenrolled,
            "Successfully unenrolled from the course",
        ))
    } else {
        Ok(EnrollmentOutcome::new(
            OutcomeKind::NotEnrolled,
            "You are not enrolled in this course",
        ))
    }
}

pub async fn pending_requests(
    store: &dyn EnrollmentStore,
    actor: &Actor,
    course_id: Uuid,
) -> AppResult<Vec<EnrollmentRequest>> {
    let (_, facts) = access::course_facts(store, actor, course_id).await?;
    access::authorize(actor, Target::EnrollmentRequest { course: &facts }, Action::View)?;
    Ok(store.pending_for_course(course_id).await?)
}

pub async fn my_requests(
    store: &dyn EnrollmentStore,
    actor: &Actor,
) -> AppResult<Vec<EnrollmentRequest>> {
    Ok(store.requests_for_user(actor.user_id).await?)
}
