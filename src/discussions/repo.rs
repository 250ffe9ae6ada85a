use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{CommentRow, Discussion, DiscussionListRow};
use crate::access::ListScope;

const DISCUSSION_COLUMNS: &str = "id, course_id, author_id, title, content, created_at, updated_at";

impl Discussion {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Discussion>> {
        let row = sqlx::query_as::<_, Discussion>(&format!(
            "SELECT {DISCUSSION_COLUMNS} FROM discussions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find discussion")?;
        Ok(row)
    }

    /// Newest first, optionally narrowed to one course.
    pub async fn list_visible(
        db: &PgPool,
        scope: ListScope,
        course: Option<Uuid>,
    ) -> anyhow::Result<Vec<DiscussionListRow>> {
        if scope == ListScope::Nothing {
            return Ok(Vec::new());
        }
        let (all, member) = scope.as_params();
        let rows = sqlx::query_as::<_, DiscussionListRow>(
            r#"
            SELECT d.id, d.course_id, c.name AS course_name, c.number AS course_number,
                   d.author_id, u.display_name AS author_name, d.title, d.created_at,
                   (SELECT COUNT(*) FROM comments cm WHERE cm.discussion_id = d.id) AS comment_count
              FROM discussions d
              JOIN courses c ON c.id = d.course_id
              JOIN users u ON u.id = d.author_id
             WHERE ($1
                    OR c.creator_id = $2
                    OR EXISTS(SELECT 1 FROM enrollments e WHERE e.course_id = c.id AND e.user_id = $2))
               AND ($3::uuid IS NULL OR d.course_id = $3)
             ORDER BY d.created_at DESC
            "#,
        )
        .bind(all)
        .bind(member)
        .bind(course)
        .fetch_all(db)
        .await
        .context("list discussions")?;
        Ok(rows)
    }

    pub async fn create(
        db: &PgPool,
        course_id: Uuid,
        author_id: Uuid,
        title: &str,
        content: &str,
    ) -> anyhow::Result<Discussion> {
        let row = sqlx::query_as::<_, Discussion>(&format!(
            r#"
            INSERT INTO discussions (id, course_id, author_id, title, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {DISCUSSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(db)
        .await
        .context("insert discussion")?;
        Ok(row)
    }

    pub async fn comments(db: &PgPool, id: Uuid) -> anyhow::Result<Vec<CommentRow>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT cm.id, cm.discussion_id, cm.author_id, u.display_name AS author_name,
                   cm.content, cm.created_at, cm.updated_at
              FROM comments cm
              JOIN users u ON u.id = cm.author_id
             WHERE cm.discussion_id = $1
             ORDER BY cm.created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
        .context("list comments")?;
        Ok(rows)
    }

    pub async fn add_comment(
        db: &PgPool,
        id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> anyhow::Result<CommentRow> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, discussion_id, author_id, content)
                VALUES ($1, $2, $3, $4)
                RETURNING id, discussion_id, author_id, content, created_at, updated_at
            )
            SELECT i.id, i.discussion_id, i.author_id, u.display_name AS author_name,
                   i.content, i.created_at, i.updated_at
              FROM inserted i
              JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(author_id)
        .bind(content)
        .fetch_one(db)
        .await
        .context("insert comment")?;
        Ok(row)
    }
}
