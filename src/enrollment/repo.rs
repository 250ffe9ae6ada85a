use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    repo_types::EnrollmentRequest,
    store::{EnrollmentStore, InsertOutcome},
    workflow::EnrollmentAction,
};
use crate::courses::repo_types::{Course, CourseRef};

const REQUEST_COLUMNS: &str = "id, course_id, user_id, status, request_date, response_date";

/// Postgres-backed [`EnrollmentStore`].
#[derive(Clone)]
pub struct PgEnrollmentStore {
    db: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn find_course(&self, course_id: Uuid) -> anyhow::Result<Option<CourseRef>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, name, number, description, is_private, creator_id, created_at
              FROM courses WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.db)
        .await
        .context("find course")?;
        Ok(course.map(|c| c.to_ref()))
    }

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM enrollments WHERE course_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("check enrollment")?;
        Ok(exists)
    }

    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO enrollments (course_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (course_id, user_id) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("insert enrollment")?;
        Ok(res.rows_affected() == 1)
    }

    async fn unenroll(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM enrollments WHERE course_id = $1 AND user_id = $2"#)
            .bind(course_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete enrollment")?;
        Ok(res.rows_affected() > 0)
    }

    async fn find_request(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let req = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests WHERE course_id = $1 AND user_id = $2"
        ))
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find enrollment request")?;
        Ok(req)
    }

    async fn find_request_by_id(
        &self,
        request_id: Uuid,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let req = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests WHERE id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.db)
        .await
        .context("find enrollment request by id")?;
        Ok(req)
    }

    async fn insert_pending(&self, course_id: Uuid, user_id: Uuid) -> anyhow::Result<InsertOutcome> {
        // The unique constraint settles concurrent requests: the loser inserts nothing
        // and reads the winner's row.
        let created = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            r#"
            INSERT INTO enrollment_requests (id, course_id, user_id, status)
            VALUES ($1, $2, $3, 'PENDING')
            ON CONFLICT (course_id, user_id) DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("insert enrollment request")?;

        if let Some(req) = created {
            return Ok(InsertOutcome::Created(req));
        }
        let existing = self
            .find_request(course_id, user_id)
            .await?
            .context("enrollment request vanished after conflict")?;
        Ok(InsertOutcome::Existing(existing))
    }

    async fn resolve_pending(
        &self,
        request_id: Uuid,
        action: EnrollmentAction,
    ) -> anyhow::Result<Option<EnrollmentRequest>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let updated = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            r#"
            UPDATE enrollment_requests
               SET status = $2, response_date = now()
             WHERE id = $1 AND status = 'PENDING'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(request_id)
        .bind(action.target_status())
        .fetch_optional(&mut *tx)
        .await
        .context("update enrollment request")?;

        let Some(req) = updated else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        if action.grants_membership() {
            sqlx::query(
                r#"
                INSERT INTO enrollments (course_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (course_id, user_id) DO NOTHING
                "#,
            )
            .bind(req.course_id)
            .bind(req.user_id)
            .execute(&mut *tx)
            .await
            .context("insert enrollment on approval")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(Some(req))
    }

    async fn pending_for_course(&self, course_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>> {
        let rows = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM enrollment_requests
             WHERE course_id = $1 AND status = 'PENDING'
             ORDER BY request_date ASC
            "#
        ))
        .bind(course_id)
        .fetch_all(&self.db)
        .await
        .context("list pending requests")?;
        Ok(rows)
    }

    async fn requests_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<EnrollmentRequest>> {
        let rows = sqlx::query_as::<_, EnrollmentRequest>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM enrollment_requests
             WHERE user_id = $1
             ORDER BY request_date DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list user requests")?;
        Ok(rows)
    }
}
