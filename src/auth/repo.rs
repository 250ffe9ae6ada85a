use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{identity::VerifiedIdentity, repo_types::User, role::Role};

const USER_COLUMNS: &str = "id, subject, email, display_name, role, role_selected_at, created_at";

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    pub async fn find_by_subject(db: &PgPool, subject: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE subject = $1"
        ))
        .bind(subject)
        .fetch_optional(db)
        .await
        .context("find user by subject")?;
        Ok(user)
    }

    /// Role as stored now, which may differ from the one in an older token.
    pub async fn current_role(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Role>> {
        let role: Option<(Role,)> = sqlx::query_as("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
            .context("read user role")?;
        Ok(role.map(|(r,)| r))
    }

    /// Look the user up by provider subject, creating it with role `user` on
    /// first sight. The flag tells whether a row was created.
    pub async fn find_or_create(
        db: &PgPool,
        identity: &VerifiedIdentity,
    ) -> anyhow::Result<(User, bool)> {
        if let Some(user) = Self::find_by_subject(db, &identity.subject).await? {
            return Ok((user, false));
        }

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, subject, email, display_name, role)
            VALUES ($1, $2, $3, $4, 'user')
            ON CONFLICT (subject) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(&identity.display_name)
        .fetch_optional(db)
        .await
        .context("insert user")?;

        match created {
            Some(user) => Ok((user, true)),
            // lost a race against a concurrent first sign-in
            None => {
                let user = Self::find_by_subject(db, &identity.subject)
                    .await?
                    .context("user vanished after conflict")?;
                Ok((user, false))
            }
        }
    }

    /// Onboarding: set the role once. `None` when it was already selected.
    pub async fn select_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET role = $2, role_selected_at = now()
             WHERE id = $1 AND role_selected_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await
        .context("select role")?;
        Ok(user)
    }

    /// Admin path: overwrite the role. `None` when the user does not exist.
    pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET role = $2, role_selected_at = COALESCE(role_selected_at, now())
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await
        .context("set role")?;
        Ok(user)
    }
}

#[cfg(test)]
impl User {
    /// Insert a user for database tests and return its id.
    pub async fn seed(db: &PgPool, subject: &str) -> Uuid {
        let identity = VerifiedIdentity {
            subject: subject.to_string(),
            display_name: subject.to_string(),
            email: format!("{subject}@example.com"),
        };
        Self::find_or_create(db, &identity).await.unwrap().0.id
    }
}
