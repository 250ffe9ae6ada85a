use serde::Serialize;
use uuid::Uuid;

use super::repo_types::EnrollmentRequest;

/// Pending requests a creator sees for one course, oldest first.
#[derive(Debug, Serialize)]
pub struct PendingRequests {
    pub course_id: Uuid,
    pub requests: Vec<EnrollmentRequest>,
}

#[derive(Debug, Serialize)]
pub struct MyRequests {
    pub requests: Vec<EnrollmentRequest>,
}
