use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::EnrollmentRequest,
    store::{EnrollmentStore, InsertOutcome},
    workflow::{EnrollmentAction, EnrollmentStatus},
};
use crate::courses::repo_types::{CourseRef, Privacy};

#[derive(Default)]
struct Inner {
    courses: HashMap<Uuid, CourseRef>,
    enrollments: HashSet<(Uuid, Uuid)>,
    requests: Vec<EnrollmentRequest>,
}

/// In-process [`EnrollmentStore`]; one mutex makes every call atomic.
#[derive(Default)]
pub struct MemoryEnrollmentStore {
    inner: Mutex<Inner>,
}

impl MemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, creator_id: Uuid, privacy: Privacy) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().courses.insert(
            id,
            CourseRef {
                id,
                creator_id,
                privacy,
            },
        );
        id
    }

    pub fn enrolled_users(&self, course_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.lock().unwrap();
        inner
            .enrollments
            .iter()
            .filter(|(c, _)| *c == course_id)
            .map(|(_, u)| *u)
            .collect()
    }

    pub fn enrolled_courses(&self, user_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.lock().unwrap();
        inner
            .enrollments
            .iter()
            .filter(|(_, u)| *u == user_id)
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl EnrollmentStore for MemoryEnrollmentStore {
    async fn find_course(&self, course_id: Uuid) -> anyhow::Result<Option<CourseRef>> {
        Ok(self.inner.lock().unwrap().courses.get(&course_id).copied())
    }

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .contains(&(course_id, user_id)))
    }

    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .insert((course_id, user_id)))
    }

    async fn unenroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .remove(&(course_id, user_id)))
    }

    async fn find_request(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .iter()
            .find(|r| r.course_id == course_id && r.user_id == user_id)
            .cloned())
    }

    async fn find_request_by_id(
        &self,
        request_id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn insert_pending(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<InsertOutcome> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .requests
            .iter()
            .find(|r| r.course_id == course_id && r.user_id == user_id)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        let req = EnrollmentRequest {
            id: Uuid::new_v4(),
            course_id,
            user_id,
            status: EnrollmentStatus::Pending,
            request_date: OffsetDateTime::now_utc(),
            response_date: None,
        };
        inner.requests.push(req.clone());
        Ok(InsertOutcome::Created(req))
    }

    async fn resolve_pending(
        &self,
        request_id: Uuid,
        action: EnrollmentAction,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(req) = inner
            .requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == EnrollmentStatus::Pending)
        else {
            return Ok(None);
        };
        req.status = action.target_status();
        req.response_date = Some(OffsetDateTime::now_utc());
        let resolved = req.clone();
        if action.grants_membership() {
            inner
                .enrollments
                .insert((resolved.course_id, resolved.user_id));
        }
        Ok(Some(resolved))
    }

    async fn pending_for_course(&self, course_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .iter()
            .filter(|r| r.course_id == course_id && r.status == EnrollmentStatus::Pending)
            .cloned()
            .collect())
    }

    async fn requests_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
