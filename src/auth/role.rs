use serde::{Deserialize, Serialize};

/// System-wide role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    /// Unauthenticated caller. Never stored on a user row.
    Anonymous,
}

impl Role {
    /// Roles a user may pick at onboarding or an admin may assign.
    pub fn is_assignable(self) -> bool {
        matches!(self, Role::Admin | Role::User)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Anonymous => "anonymous",
        }
    }

    pub fn greeting(self) -> &'static str {
        match self {
            Role::Admin => "Successfully signed in as an Administrator!",
            _ => "Successfully signed in as a Common User!",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_not_assignable() {
        assert!(Role::Admin.is_assignable());
        assert!(Role::User.is_assignable());
        assert!(!Role::Anonymous.is_assignable());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let r: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(r, Role::User);
    }
}
