use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{CreateCourseInput, EditDescriptionInput},
    repo_types::Privacy,
};
use crate::error::{AppError, AppResult};

pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Identity of a course for duplicate detection: two courses may not share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSignature {
    pub name: String,
    pub number: i32,
    pub description: String,
}

/// A create request that passed validation.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub signature: CourseSignature,
    pub privacy: Privacy,
}

#[cfg(test)]
impl NewCourse {
    pub fn sample(name: &str, number: i32, description: &str, privacy: Privacy) -> Self {
        Self {
            signature: CourseSignature {
                name: name.to_string(),
                number,
                description: description.to_string(),
            },
            privacy,
        }
    }
}

fn course_name(raw: &str) -> AppResult<String> {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9]{1,4}$").unwrap();
    }
    let name = raw.trim();
    if !NAME_RE.is_match(name) {
        return Err(AppError::validation(
            "Course name must be 1 to 4 alphanumeric characters",
        ));
    }
    Ok(name.to_ascii_uppercase())
}

fn course_number(number: i32) -> AppResult<i32> {
    if !(1000..=9999).contains(&number) {
        return Err(AppError::validation("Course number must be a 4-digit number"));
    }
    Ok(number)
}

fn description(raw: &str) -> AppResult<String> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(description.to_string())
}

impl CreateCourseInput {
    pub fn validate(&self) -> AppResult<NewCourse> {
        Ok(NewCourse {
            signature: CourseSignature {
                name: course_name(&self.name)?,
                number: course_number(self.number)?,
                description: description(self.description.as_deref().unwrap_or_default())?,
            },
            privacy: self.privacy.unwrap_or_default(),
        })
    }
}

impl EditDescriptionInput {
    pub fn validate(&self) -> AppResult<String> {
        description(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, number: i32, description: &str) -> CreateCourseInput {
        CreateCourseInput {
            name: name.into(),
            number,
            description: Some(description.into()),
            privacy: None,
        }
    }

    #[test]
    fn name_is_uppercased() {
        let c = input(" chem ", 1010, "Intro").validate().unwrap();
        assert_eq!(c.signature.name, "CHEM");
        assert_eq!(c.privacy, Privacy::Public);
    }

    #[test]
    fn rejects_bad_names() {
        for name in ["", "PHYSX", "CH-M", "çh"] {
            let err = input(name, 1010, "").validate().unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{name}");
        }
    }

    #[test]
    fn number_must_have_four_digits() {
        assert!(input("CS", 999, "").validate().is_err());
        assert!(input("CS", 10000, "").validate().is_err());
        assert!(input("CS", 1000, "").validate().is_ok());
        assert!(input("CS", 9999, "").validate().is_ok());
    }

    #[test]
    fn equal_inputs_share_a_signature() {
        let a = input("phys", 2020, "Mechanics").validate().unwrap();
        let b = input("PHYS", 2020, "  Mechanics ").validate().unwrap();
        assert_eq!(a.signature, b.signature);

        let c = input("PHYS", 2020, "Optics").validate().unwrap();
        assert_ne!(a.signature, c.signature);
        let d = input("PHYS", 2021, "Mechanics").validate().unwrap();
        assert_ne!(a.signature, d.signature);
    }

    #[test]
    fn description_length_is_capped() {
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        let err = EditDescriptionInput { description: long }.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
