use std::collections::HashSet;

use uuid::Uuid;

use super::{
    dto::{CourseList, CourseSummary},
    repo_types::Course,
};
use crate::access::Actor;

/// Split courses into the caller's own (created or enrolled) and the rest.
/// Anonymous callers only see public courses, all of them as available.
pub fn partition_courses(courses: &[Course], actor: &Actor, member_of: &[Uuid]) -> CourseList {
    let member_of: HashSet<Uuid> = member_of.iter().copied().collect();
    let mut list = CourseList {
        my_courses: Vec::new(),
        available_courses: Vec::new(),
    };
    for course in courses {
        if actor.is_anonymous() {
            if !course.is_private {
                list.available_courses.push(CourseSummary::from(course));
            }
            continue;
        }
        if course.creator_id == actor.user_id || member_of.contains(&course.id) {
            list.my_courses.push(CourseSummary::from(course));
        } else {
            list.available_courses.push(CourseSummary::from(course));
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;
    use time::OffsetDateTime;

    fn course(creator_id: Uuid, is_private: bool) -> Course {
        Course {
            id: Uuid::new_v4(),
            name: "CS".into(),
            number: 1010,
            description: String::new(),
            is_private,
            creator_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn anonymous_sees_public_courses_only() {
        let courses = vec![course(Uuid::new_v4(), false), course(Uuid::new_v4(), true)];
        let list = partition_courses(&courses, &Actor::anonymous(), &[]);
        assert!(list.my_courses.is_empty());
        assert_eq!(list.available_courses.len(), 1);
        assert_eq!(list.available_courses[0].id, courses[0].id);
    }

    #[test]
    fn users_see_own_courses_apart_from_the_rest() {
        let me = Actor::new(Uuid::new_v4(), Role::User);
        let created = course(me.user_id, true);
        let joined = course(Uuid::new_v4(), false);
        let private_other = course(Uuid::new_v4(), true);
        let courses = vec![created, joined, private_other];

        let list = partition_courses(&courses, &me, &[courses[1].id]);
        let mine: Vec<Uuid> = list.my_courses.iter().map(|c| c.id).collect();
        assert_eq!(mine, vec![courses[0].id, courses[1].id]);
        assert_eq!(list.available_courses.len(), 1);
        assert_eq!(list.available_courses[0].id, courses[2].id);
    }
}
