use async_trait::async_trait;
use uuid::Uuid;

use super::{repo_types::EnrollmentRequest, workflow::EnrollmentAction};
use crate::courses::repo_types::CourseRef;

/// Result of inserting a PENDING request for a (course, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(EnrollmentRequest),
    /// A request for the pair already existed, whatever its status.
    Existing(EnrollmentRequest),
}

/// Persistence of memberships and enrollment requests.
///
/// Implementations must make [`EnrollmentStore::resolve_pending`] atomic: the
/// status change and the membership row land together or not at all.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find_course(&self, course_id: Uuid) -> anyhow::Result<Option<CourseRef>>;

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;

    /// Returns `false` when the user was already enrolled.
    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;

    /// Returns `false` when the user was not enrolled.
    async fn unenroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;

    async fn find_request(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentRequest>>;

    async fn find_request_by_id(&self, request_id: Uuid)
        -> anyhow::Result<Option<EnrollmentRequest>>;

    async fn insert_pending(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<InsertOutcome>;

    /// Move a PENDING request to its decided state and, on approval, add the
    /// membership. `None` when the request is no longer PENDING.
    async fn resolve_pending(
        &self,
        request_id: Uuid,
        action: EnrollmentAction,
    ) -> anyhow::Result<Option<EnrollmentRequest>>;

    async fn pending_for_course(&self, course_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>>;

    async fn requests_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>>;
}
