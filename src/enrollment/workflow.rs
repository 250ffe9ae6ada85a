use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enrollment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EnrollmentStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Approved => "APPROVED",
            EnrollmentStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Creator's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentAction {
    Approve,
    Reject,
}

impl EnrollmentAction {
    pub fn target_status(self) -> EnrollmentStatus {
        match self {
            EnrollmentAction::Approve => EnrollmentStatus::Approved,
            EnrollmentAction::Reject => EnrollmentStatus::Rejected,
        }
    }

    /// Approval adds the membership row in the same transaction.
    pub fn grants_membership(self) -> bool {
        self == EnrollmentAction::Approve
    }
}

impl FromStr for EnrollmentAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" => Ok(EnrollmentAction::Approve),
            "reject" => Ok(EnrollmentAction::Reject),
            _ => Err(AppError::validation("Invalid action")),
        }
    }
}

/// PENDING → APPROVED | REJECTED; terminal states never move.
pub fn transition(
    current: EnrollmentStatus,
    action: EnrollmentAction,
) -> Result<EnrollmentStatus, AppError> {
    if current.is_terminal() {
        return Err(AppError::conflict(format!(
            "Enrollment request was already {}",
            current.as_str().to_lowercase()
        )));
    }
    Ok(action.target_status())
}

/// A user's relationship to a course, as shown next to the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    Creator,
    Enrolled,
    Pending,
    Rejected,
    NotRequested,
}

impl EnrollmentState {
    /// An APPROVED request without a membership row means the user unenrolled
    /// afterwards; it reads as not requested.
    pub fn derive(is_creator: bool, enrolled: bool, request: Option<EnrollmentStatus>) -> Self {
        if is_creator {
            EnrollmentState::Creator
        } else if enrolled {
            EnrollmentState::Enrolled
        } else {
            match request {
                Some(EnrollmentStatus::Pending) => EnrollmentState::Pending,
                Some(EnrollmentStatus::Rejected) => EnrollmentState::Rejected,
                Some(EnrollmentStatus::Approved) | None => EnrollmentState::NotRequested,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_decided_state() {
        assert_eq!(
            transition(EnrollmentStatus::Pending, EnrollmentAction::Approve).unwrap(),
            EnrollmentStatus::Approved
        );
        assert_eq!(
            transition(EnrollmentStatus::Pending, EnrollmentAction::Reject).unwrap(),
            EnrollmentStatus::Rejected
        );
    }

    #[test]
    fn terminal_states_are_final() {
        for status in [EnrollmentStatus::Approved, EnrollmentStatus::Rejected] {
            for action in [EnrollmentAction::Approve, EnrollmentAction::Reject] {
                let err = transition(status, action).unwrap_err();
                assert!(matches!(err, AppError::Conflict(_)));
            }
        }
    }

    #[test]
    fn only_approval_grants_membership() {
        assert!(EnrollmentAction::Approve.grants_membership());
        assert!(!EnrollmentAction::Reject.grants_membership());
    }

    #[test]
    fn action_parsing() {
        assert_eq!("approve".parse::<EnrollmentAction>().unwrap(), EnrollmentAction::Approve);
        assert_eq!("REJECT".parse::<EnrollmentAction>().unwrap(), EnrollmentAction::Reject);
        assert!("maybe".parse::<EnrollmentAction>().is_err());
    }

    #[test]
    fn state_precedence() {
        use EnrollmentStatus::*;
        assert_eq!(EnrollmentState::derive(true, false, Some(Pending)), EnrollmentState::Creator);
        assert_eq!(EnrollmentState::derive(false, true, Some(Rejected)), EnrollmentState::Enrolled);
        assert_eq!(EnrollmentState::derive(false, false, Some(Pending)), EnrollmentState::Pending);
        assert_eq!(EnrollmentState::derive(false, false, Some(Rejected)), EnrollmentState::Rejected);
        assert_eq!(EnrollmentState::derive(false, false, Some(Approved)), EnrollmentState::NotRequested);
        assert_eq!(EnrollmentState::derive(false, false, None), EnrollmentState::NotRequested);
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&EnrollmentStatus::Pending).unwrap(), "\"PENDING\"");
    }
}
