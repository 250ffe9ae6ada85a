use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    repo_types::{Assignment, AssignmentFile, AssignmentListRow},
    services::{NewAssignment, NewFile},
};
use crate::access::ListScope;

const ASSIGNMENT_COLUMNS: &str = "id, course_id, owner_id, title, description, due_date, created_at";
const FILE_COLUMNS: &str = "id, assignment_id, uploaded_by, title, description, keywords, storage_key, content_type, uploaded_at";

impl Assignment {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find assignment")?;
        Ok(row)
    }

    /// Assignments the scope can see, earliest due first, with `user_id`'s
    /// completion marker.
    pub async fn list_visible(
        db: &PgPool,
        scope: ListScope,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<AssignmentListRow>> {
        if scope == ListScope::Nothing {
            return Ok(Vec::new());
        }
        let (all, member) = scope.as_params();
        let rows = sqlx::query_as::<_, AssignmentListRow>(
            r#"
            SELECT a.id, a.course_id, c.name AS course_name, c.number AS course_number,
                   a.owner_id, a.title, a.description, a.due_date, a.created_at,
                   EXISTS(
                       SELECT 1 FROM assignment_completions ac
                        WHERE ac.assignment_id = a.id AND ac.user_id = $3
                   ) AS completed
              FROM assignments a
              JOIN courses c ON c.id = a.course_id
             WHERE $1
                OR c.creator_id = $2
                OR EXISTS(SELECT 1 FROM enrollments e WHERE e.course_id = c.id AND e.user_id = $2)
             ORDER BY a.due_date ASC, a.created_at ASC
            "#,
        )
        .bind(all)
        .bind(member)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list visible assignments")?;
        Ok(rows)
    }

    pub async fn create(db: &PgPool, new: &NewAssignment, owner_id: Uuid) -> anyhow::Result<Assignment> {
        let row = sqlx::query_as::<_, Assignment>(&format!(
            r#"
            INSERT INTO assignments (id, course_id, owner_id, title, description, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.course_id)
        .bind(owner_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.due_date)
        .fetch_one(db)
        .await
        .context("insert assignment")?;
        Ok(row)
    }

    pub async fn update(db: &PgPool, id: Uuid, new: &NewAssignment) -> anyhow::Result<Option<Assignment>> {
        let row = sqlx::query_as::<_, Assignment>(&format!(
            r#"
            UPDATE assignments
               SET course_id = $2, title = $3, description = $4, due_date = $5
             WHERE id = $1
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.course_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.due_date)
        .fetch_optional(db)
        .await
        .context("update assignment")?;
        Ok(row)
    }

    /// Delete the assignment with its files and completion markers. Returns the
    /// storage keys of the removed files.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Vec<String>> {
        let mut tx = db.begin().await.context("begin tx")?;

        sqlx::query(r#"DELETE FROM assignment_completions WHERE assignment_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete completions")?;

        let keys: Vec<(String,)> = sqlx::query_as(
            r#"DELETE FROM assignment_files WHERE assignment_id = $1 RETURNING storage_key"#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("delete files")?;

        sqlx::query(r#"DELETE FROM assignments WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete assignment")?;

        tx.commit().await.context("commit tx")?;
        Ok(keys.into_iter().map(|(k,)| k).collect())
    }

    /// Flip the user's completion marker. Returns whether the assignment is
    /// now completed.
    pub async fn toggle_completion(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let mut tx = db.begin().await.context("begin tx")?;

        let removed = sqlx::query(
            r#"DELETE FROM assignment_completions WHERE assignment_id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("delete completion")?;

        let completed = if removed.rows_affected() > 0 {
            false
        } else {
            sqlx::query(
                r#"
                INSERT INTO assignment_completions (user_id, assignment_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("insert completion")?;
            true
        };

        tx.commit().await.context("commit tx")?;
        Ok(completed)
    }
}

impl AssignmentFile {
    pub async fn for_assignments(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<AssignmentFile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, AssignmentFile>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
              FROM assignment_files
             WHERE assignment_id = ANY($1)
             ORDER BY uploaded_at ASC
            "#
        ))
        .bind(ids)
        .fetch_all(db)
        .await
        .context("list assignment files")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, assignment_id: Uuid, file_id: Uuid) -> anyhow::Result<Option<AssignmentFile>> {
        let row = sqlx::query_as::<_, AssignmentFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM assignment_files WHERE id = $1 AND assignment_id = $2"
        ))
        .bind(file_id)
        .bind(assignment_id)
        .fetch_optional(db)
        .await
        .context("find assignment file")?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, new: &NewFile) -> anyhow::Result<AssignmentFile> {
        let row = sqlx::query_as::<_, AssignmentFile>(&format!(
            r#"
            INSERT INTO assignment_files
                (id, assignment_id, uploaded_by, title, description, keywords, storage_key, content_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {FILE_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.assignment_id)
        .bind(new.uploaded_by)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.keywords)
        .bind(&new.storage_key)
        .bind(&new.content_type)
        .fetch_one(db)
        .await
        .context("insert assignment file")?;
        Ok(row)
    }

    /// Returns the storage key of the removed file, `None` when it did not exist.
    pub async fn delete(db: &PgPool, assignment_id: Uuid, file_id: Uuid) -> anyhow::Result<Option<String>> {
        let key: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM assignment_files
             WHERE id = $1 AND assignment_id = $2
            RETURNING storage_key
            "#,
        )
        .bind(file_id)
        .bind(assignment_id)
        .fetch_optional(db)
        .await
        .context("delete assignment file")?;
        Ok(key.map(|(k,)| k))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        auth::repo_types::User,
        courses::{
            repo_types::{Course, Privacy},
            validation::NewCourse,
        },
    };

    async fn completion_rows(db: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM assignment_completions")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn toggling_twice_leaves_no_marker(db: PgPool) {
        let user = User::seed(&db, "student").await;
        let course = NewCourse::sample("MATH", 3100, "Linear algebra", Privacy::Public);
        let course = Course::create(&db, &course, user).await.unwrap().unwrap();
        let assignment = Assignment::create(
            &db,
            &NewAssignment {
                course_id: course.id,
                title: "Problem set 4".into(),
                description: String::new(),
                due_date: date!(2026 - 11 - 02),
            },
            user,
        )
        .await
        .unwrap();

        assert!(Assignment::toggle_completion(&db, assignment.id, user).await.unwrap());
        assert_eq!(completion_rows(&db).await, 1);
        let rows = Assignment::list_visible(&db, ListScope::MemberOf(user), user).await.unwrap();
        assert!(rows[0].completed);

        assert!(!Assignment::toggle_completion(&db, assignment.id, user).await.unwrap());
        assert_eq!(completion_rows(&db).await, 0);
        let rows = Assignment::list_visible(&db, ListScope::MemberOf(user), user).await.unwrap();
        assert!(!rows[0].completed);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn completion_markers_are_per_user(db: PgPool) {
        let alice = User::seed(&db, "alice").await;
        let bob = User::seed(&db, "bob").await;
        let course = NewCourse::sample("MATH", 3100, "Linear algebra", Privacy::Public);
        let course = Course::create(&db, &course, alice).await.unwrap().unwrap();
        let assignment = Assignment::create(
            &db,
            &NewAssignment {
                course_id: course.id,
                title: "Problem set 5".into(),
                description: String::new(),
                due_date: date!(2026 - 11 - 09),
            },
            alice,
        )
        .await
        .unwrap();

        assert!(Assignment::toggle_completion(&db, assignment.id, alice).await.unwrap());
        assert!(Assignment::toggle_completion(&db, assignment.id, bob).await.unwrap());
        assert!(!Assignment::toggle_completion(&db, assignment.id, alice).await.unwrap());
        assert_eq!(completion_rows(&db).await, 1);

        let keys = Assignment::delete(&db, assignment.id).await.unwrap();
        assert!(keys.is_empty());
        assert_eq!(completion_rows(&db).await, 0);
    }
}
