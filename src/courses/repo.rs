use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{repo_types::Course, validation::NewCourse};

const COURSE_COLUMNS: &str = "id, name, number, description, is_private, creator_id, created_at";

/// The new description would give the course another course's signature.
#[derive(Debug)]
pub enum DescriptionUpdate {
    Updated(Course),
    Duplicate,
    Missing,
}

#[derive(Debug, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub display_name: String,
}

impl Course {
    /// Insert the course and enroll its creator. `None` when a course with the
    /// same name, number and description already exists.
    pub async fn create(
        db: &PgPool,
        new: &NewCourse,
        creator_id: Uuid,
    ) -> anyhow::Result<Option<Course>> {
        let mut tx = db.begin().await.context("begin tx")?;

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (id, name, number, description, is_private, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.signature.name)
        .bind(new.signature.number)
        .bind(&new.signature.description)
        .bind(new.privacy.is_private())
        .bind(creator_id)
        .fetch_optional(&mut *tx)
        .await
        .context("insert course")?;

        let Some(course) = course else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        sqlx::query(r#"INSERT INTO enrollments (course_id, user_id) VALUES ($1, $2)"#)
            .bind(course.id)
            .bind(creator_id)
            .execute(&mut *tx)
            .await
            .context("enroll creator")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(course))
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find course")?;
        Ok(course)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Course>> {
        let rows = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY name, number, created_at"
        ))
        .fetch_all(db)
        .await
        .context("list courses")?;
        Ok(rows)
    }

    /// Ids of courses the user created or is enrolled in.
    pub async fn member_course_ids(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM courses WHERE creator_id = $1
            UNION
            SELECT course_id FROM enrollments WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list member courses")?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn update_description(
        db: &PgPool,
        id: Uuid,
        description: &str,
    ) -> anyhow::Result<DescriptionUpdate> {
        let res = sqlx::query_as::<_, Course>(&format!(
            r#"
            UPDATE courses SET description = $2
             WHERE id = $1
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(description)
        .fetch_optional(db)
        .await;

        match res {
            Ok(Some(course)) => Ok(DescriptionUpdate::Updated(course)),
            Ok(None) => Ok(DescriptionUpdate::Missing),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(DescriptionUpdate::Duplicate)
            }
            Err(e) => Err(anyhow::Error::new(e).context("update course description")),
        }
    }

    pub async fn members(db: &PgPool, id: Uuid) -> anyhow::Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, Member>(
            r#"
            SELECT u.id, u.display_name
              FROM enrollments e
              JOIN users u ON u.id = e.user_id
             WHERE e.course_id = $1
             ORDER BY e.enrolled_at
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
        .context("list course members")?;
        Ok(rows)
    }

    /// Delete the course and everything hanging off it in one transaction.
    /// Returns the storage keys of the removed attachments; `None` when the
    /// course did not exist.
    pub async fn delete_cascade(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Vec<String>>> {
        let mut tx = db.begin().await.context("begin tx")?;

        sqlx::query(r#"DELETE FROM enrollment_requests WHERE course_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete enrollment requests")?;

        sqlx::query(
            r#"
            DELETE FROM assignment_completions
             WHERE assignment_id IN (SELECT id FROM assignments WHERE course_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("delete completions")?;

        let keys: Vec<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM assignment_files
             WHERE assignment_id IN (SELECT id FROM assignments WHERE course_id = $1)
            RETURNING storage_key
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("delete assignment files")?;

        sqlx::query(r#"DELETE FROM assignments WHERE course_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete assignments")?;

        sqlx::query(
            r#"
            DELETE FROM comments
             WHERE discussion_id IN (SELECT id FROM discussions WHERE course_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("delete comments")?;

        sqlx::query(r#"DELETE FROM discussions WHERE course_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete discussions")?;

        sqlx::query(r#"DELETE FROM enrollments WHERE course_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete enrollments")?;

        let res = sqlx::query(r#"DELETE FROM courses WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete course")?;

        if res.rows_affected() == 0 {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        }

        tx.commit().await.context("commit tx")?;
        Ok(Some(keys.into_iter().map(|(k,)| k).collect()))
    }
}
