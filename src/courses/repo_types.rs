use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

impl Default for Privacy {
    fn default() -> Self {
        Privacy::Public
    }
}

impl From<bool> for Privacy {
    fn from(is_private: bool) -> Self {
        if is_private {
            Privacy::Private
        } else {
            Privacy::Public
        }
    }
}

impl Privacy {
    pub fn is_private(self) -> bool {
        self == Privacy::Private
    }
}

/// Course record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub name: String,        // upper-case subject code, e.g. CHEM
    pub number: i32,         // 1000..=9999
    pub description: String,
    pub is_private: bool,
    pub creator_id: Uuid,    // immutable after creation
    pub created_at: OffsetDateTime,
}

impl Course {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.number)
    }

    pub fn privacy(&self) -> Privacy {
        self.is_private.into()
    }

    pub fn to_ref(&self) -> CourseRef {
        CourseRef {
            id: self.id,
            creator_id: self.creator_id,
            privacy: self.privacy(),
        }
    }
}

/// The slice of a course the access rules and the enrollment workflow need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseRef {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub privacy: Privacy,
}
