use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Course, Privacy};
use crate::enrollment::workflow::EnrollmentState;

#[derive(Debug, Deserialize)]
pub struct CreateCourseInput {
    pub name: String,
    pub number: i32,
    pub description: Option<String>,
    pub privacy: Option<Privacy>,
}

#[derive(Debug, Deserialize)]
pub struct EditDescriptionInput {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: Uuid,
    pub name: String,
    pub number: i32,
    pub full_name: String,
    pub description: String,
    pub privacy: Privacy,
    pub creator_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Course> for CourseSummary {
    fn from(c: &Course) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            number: c.number,
            full_name: c.full_name(),
            description: c.description.clone(),
            privacy: c.privacy(),
            creator_id: c.creator_id,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseList {
    /// Courses the caller created or is enrolled in.
    pub my_courses: Vec<CourseSummary>,
    pub available_courses: Vec<CourseSummary>,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: CourseSummary,
    pub enrollment: EnrollmentState,
    pub can_edit: bool,
    pub can_delete: bool,
    /// Only filled in for members of the course.
    pub members: Vec<MemberView>,
}
