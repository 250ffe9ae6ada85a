use uuid::Uuid;

use crate::{
    auth::role::Role,
    courses::repo_types::{CourseRef, Privacy},
    error::{AppError, AppResult},
};

/// Authenticated (or anonymous) caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: Uuid::nil(),
            role: Role::Anonymous,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_anonymous(&self) -> bool {
        self.role == Role::Anonymous
    }
}

/// What the evaluator knows about a course relative to one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseFacts {
    pub creator_id: Uuid,
    pub privacy: Privacy,
    /// Explicit membership row for the actor.
    pub enrolled: bool,
}

impl CourseFacts {
    pub fn new(course: &CourseRef, enrolled: bool) -> Self {
        Self {
            creator_id: course.creator_id,
            privacy: course.privacy,
            enrolled,
        }
    }

    pub fn is_creator(&self, actor: &Actor) -> bool {
        !actor.is_anonymous() && self.creator_id == actor.user_id
    }

    /// The creator counts as enrolled even without a membership row.
    pub fn is_member(&self, actor: &Actor) -> bool {
        !actor.is_anonymous() && (self.enrolled || self.is_creator(actor))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Course(&'a CourseFacts),
    Assignment {
        course: &'a CourseFacts,
        owner_id: Uuid,
    },
    AssignmentFile {
        course: &'a CourseFacts,
    },
    EnrollmentRequest {
        course: &'a CourseFacts,
    },
    Discussion {
        course: &'a CourseFacts,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Decide,
    Post,
    /// Mark an assignment done for oneself.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    fn from_rule(allowed: bool, reason: &'static str) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(reason)
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decide whether `actor` may perform `action` on `target`. Never touches storage.
pub fn evaluate(actor: &Actor, target: Target<'_>, action: Action) -> Decision {
    match (target, action) {
        (Target::Course(c), Action::View) => Decision::from_rule(
            c.is_creator(actor) || c.privacy == Privacy::Public || c.is_member(actor),
            "You do not have access to this course",
        ),
        (Target::Course(c), Action::Delete) => Decision::from_rule(
            c.is_creator(actor) || actor.is_admin(),
            "Only the course creator or an admin can delete this course",
        ),
        (Target::Course(c), Action::Edit) => Decision::from_rule(
            c.is_creator(actor),
            "Only the course creator can edit this course",
        ),

        (Target::Assignment { course, .. }, Action::View) => Decision::from_rule(
            course.is_member(actor) || actor.is_admin(),
            "You must be enrolled in this course to view its assignments",
        ),
        (Target::Assignment { course, .. }, Action::Complete) => Decision::from_rule(
            course.is_member(actor),
            "You must be enrolled in this course to track its assignments",
        ),
        (Target::Assignment { course, .. }, Action::Create) => Decision::from_rule(
            course.is_member(actor),
            "You must be enrolled in this course to add assignments",
        ),
        (Target::Assignment { course, owner_id }, Action::Edit) => Decision::from_rule(
            owner_id == actor.user_id && course.is_member(actor),
            "You can't edit this assignment",
        ),
        (Target::Assignment { course, owner_id }, Action::Delete) => Decision::from_rule(
            owner_id == actor.user_id && course.is_member(actor),
            "You can't delete this assignment",
        ),

        (Target::AssignmentFile { course }, Action::View) => Decision::from_rule(
            course.is_member(actor) || actor.is_admin(),
            "You must be enrolled in this course to download its files",
        ),
        (Target::AssignmentFile { course }, Action::Delete) => Decision::from_rule(
            actor.is_admin() || course.is_member(actor),
            "You don't have permission to delete this file",
        ),

        (Target::EnrollmentRequest { course }, Action::Decide | Action::View) => {
            Decision::from_rule(
                course.is_creator(actor),
                "Only the course creator can manage enrollment requests",
            )
        }

        (Target::Discussion { course }, Action::View | Action::Post | Action::Create) => {
            Decision::from_rule(
                course.is_member(actor),
                "You must be enrolled in this course to take part in its discussions",
            )
        }

        _ => Decision::Deny("Operation not permitted"),
    }
}

/// [`evaluate`] mapped onto [`AppError::Forbidden`].
pub fn authorize(actor: &Actor, target: Target<'_>, action: Action) -> AppResult<()> {
    match evaluate(actor, target, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(user_id = %actor.user_id, role = %actor.role, ?action, reason, "access denied");
            Err(AppError::forbidden(reason))
        }
    }
}

/// Which rows a listing or search may return for an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Admin override: everything in the system.
    All,
    /// Courses the user created or is enrolled in.
    MemberOf(Uuid),
    Nothing,
}

impl ListScope {
    pub fn for_actor(actor: &Actor) -> Self {
        if actor.is_admin() {
            ListScope::All
        } else if actor.is_anonymous() {
            ListScope::Nothing
        } else {
            ListScope::MemberOf(actor.user_id)
        }
    }

    /// Bind parameters for `WHERE $1 OR <member-of $2>` style queries.
    pub fn as_params(self) -> (bool, Uuid) {
        match self {
            ListScope::All => (true, Uuid::nil()),
            ListScope::MemberOf(id) => (false, id),
            ListScope::Nothing => (false, Uuid::nil()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), Role::User)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    fn course(creator: &Actor, privacy: Privacy, enrolled: bool) -> CourseFacts {
        CourseFacts {
            creator_id: creator.user_id,
            privacy,
            enrolled,
        }
    }

    #[test]
    fn private_course_visible_to_creator_and_members_only() {
        let creator = user();
        let stranger = user();
        let facts = course(&creator, Privacy::Private, false);
        assert!(evaluate(&creator, Target::Course(&facts), Action::View).is_allowed());
        assert!(!evaluate(&stranger, Target::Course(&facts), Action::View).is_allowed());

        let member_facts = CourseFacts { enrolled: true, ..facts };
        assert!(evaluate(&stranger, Target::Course(&member_facts), Action::View).is_allowed());
    }

    #[test]
    fn public_course_visible_to_everyone_including_anonymous() {
        let creator = user();
        let facts = course(&creator, Privacy::Public, false);
        assert!(evaluate(&Actor::anonymous(), Target::Course(&facts), Action::View).is_allowed());
        assert!(evaluate(&user(), Target::Course(&facts), Action::View).is_allowed());
    }

    #[test]
    fn course_delete_by_creator_or_admin_edit_by_creator_only() {
        let creator = user();
        let facts = course(&creator, Privacy::Public, false);
        let admin = admin();
        assert!(evaluate(&creator, Target::Course(&facts), Action::Delete).is_allowed());
        assert!(evaluate(&admin, Target::Course(&facts), Action::Delete).is_allowed());
        assert!(!evaluate(&user(), Target::Course(&facts), Action::Delete).is_allowed());

        assert!(evaluate(&creator, Target::Course(&facts), Action::Edit).is_allowed());
        assert!(!evaluate(&admin, Target::Course(&facts), Action::Edit).is_allowed());
    }

    #[test]
    fn assignment_view_needs_membership_unless_admin() {
        let creator = user();
        let outsider = course(&creator, Privacy::Public, false);
        let target = Target::Assignment {
            course: &outsider,
            owner_id: creator.user_id,
        };
        assert!(!evaluate(&user(), target, Action::View).is_allowed());
        assert!(evaluate(&admin(), target, Action::View).is_allowed());
        assert!(evaluate(&creator, target, Action::View).is_allowed());
    }

    #[test]
    fn completion_needs_membership_even_for_admins() {
        let creator = user();
        let outside = course(&creator, Privacy::Public, false);
        let target = Target::Assignment {
            course: &outside,
            owner_id: creator.user_id,
        };
        assert!(evaluate(&admin(), target, Action::View).is_allowed());
        assert!(!evaluate(&admin(), target, Action::Complete).is_allowed());
        assert!(!evaluate(&user(), target, Action::Complete).is_allowed());
        assert!(evaluate(&creator, target, Action::Complete).is_allowed());

        let inside = course(&creator, Privacy::Public, true);
        let enrolled = Target::Assignment {
            course: &inside,
            owner_id: creator.user_id,
        };
        assert!(evaluate(&user(), enrolled, Action::Complete).is_allowed());
    }

    #[test]
    fn assignment_delete_and_edit_need_owner_and_membership() {
        let creator = user();
        let owner = user();
        let enrolled = course(&creator, Privacy::Private, true);
        let owned = Target::Assignment {
            course: &enrolled,
            owner_id: owner.user_id,
        };
        assert!(evaluate(&owner, owned, Action::Delete).is_allowed());
        assert!(evaluate(&owner, owned, Action::Edit).is_allowed());

        // enrolled non-owner
        let other = user();
        assert!(!evaluate(&other, owned, Action::Delete).is_allowed());
        assert!(!evaluate(&other, owned, Action::Edit).is_allowed());

        // owner who has since unenrolled
        let left = course(&creator, Privacy::Private, false);
        let stale = Target::Assignment {
            course: &left,
            owner_id: owner.user_id,
        };
        assert!(!evaluate(&owner, stale, Action::Delete).is_allowed());

        // admin gets no ownership rights
        assert!(!evaluate(&admin(), owned, Action::Delete).is_allowed());
    }

    #[test]
    fn file_delete_allowed_for_admin_or_member() {
        let creator = user();
        let outside = course(&creator, Privacy::Public, false);
        let inside = course(&creator, Privacy::Public, true);
        assert!(evaluate(&admin(), Target::AssignmentFile { course: &outside }, Action::Delete).is_allowed());
        assert!(!evaluate(&user(), Target::AssignmentFile { course: &outside }, Action::Delete).is_allowed());
        assert!(evaluate(&user(), Target::AssignmentFile { course: &inside }, Action::Delete).is_allowed());
    }

    #[test]
    fn only_creator_decides_enrollment_requests() {
        let creator = user();
        let facts = course(&creator, Privacy::Private, false);
        let target = Target::EnrollmentRequest { course: &facts };
        assert!(evaluate(&creator, target, Action::Decide).is_allowed());
        assert!(!evaluate(&admin(), target, Action::Decide).is_allowed());
        let enrolled = CourseFacts { enrolled: true, ..facts };
        assert!(!evaluate(&user(), Target::EnrollmentRequest { course: &enrolled }, Action::Decide).is_allowed());
    }

    #[test]
    fn discussions_are_members_only() {
        let creator = user();
        let facts = course(&creator, Privacy::Public, false);
        let target = Target::Discussion { course: &facts };
        assert!(evaluate(&creator, target, Action::Post).is_allowed());
        assert!(!evaluate(&user(), target, Action::View).is_allowed());
        assert!(!evaluate(&admin(), target, Action::Post).is_allowed());
    }

    #[test]
    fn anonymous_never_matches_creator() {
        let facts = CourseFacts {
            creator_id: Uuid::nil(),
            privacy: Privacy::Private,
            enrolled: true,
        };
        let anon = Actor::anonymous();
        assert!(!evaluate(&anon, Target::Course(&facts), Action::View).is_allowed());
        assert!(!evaluate(&anon, Target::Course(&facts), Action::Delete).is_allowed());
    }

    #[test]
    fn authorize_reports_forbidden() {
        let facts = course(&user(), Privacy::Private, false);
        let err = authorize(&user(), Target::Course(&facts), Action::Edit).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn list_scope_by_role() {
        assert_eq!(ListScope::for_actor(&admin()), ListScope::All);
        assert_eq!(ListScope::for_actor(&Actor::anonymous()), ListScope::Nothing);
        let u = user();
        assert_eq!(ListScope::for_actor(&u), ListScope::MemberOf(u.user_id));
        assert!(ListScope::All.as_params().0);
    }
}
