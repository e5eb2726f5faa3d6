//! Schools, classes and subjects.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MAX_GRADE_LEVEL, MIN_GRADE_LEVEL};
use crate::errors::{AppError, AppResult};

/// Subject codes look like `MATH`, `BIO-101` or `CS2`.
pub static SUBJECT_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,4}-?[0-9]{0,3}$").expect("valid subject code regex"));

/// A tenant: every user, class and subject belongs to one school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct School {
    pub id: Uuid,
    #[schema(example = "Riverside High")]
    pub name: String,
    pub address: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSchool {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolChanges {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Class {
    pub id: Uuid,
    pub school_id: Uuid,
    #[schema(example = "7B")]
    pub name: String,
    #[schema(example = 7)]
    pub grade_level: i32,
    pub teacher_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub school_id: Uuid,
    pub name: String,
    pub grade_level: i32,
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassChanges {
    pub name: Option<String>,
    pub grade_level: Option<i32>,
}

/// One row of the class/student join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub class_id: Uuid,
    pub student_id: Uuid,
}

pub fn validate_grade_level(grade_level: i32) -> AppResult<()> {
    if (MIN_GRADE_LEVEL..=MAX_GRADE_LEVEL).contains(&grade_level) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Grade level must be between {} and {}",
            MIN_GRADE_LEVEL, MAX_GRADE_LEVEL
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    pub school_id: Uuid,
    #[schema(example = "Algebra")]
    pub name: String,
    #[schema(example = "MATH-7")]
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubject {
    pub school_id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Normalize a subject code to upper case and check its shape.
pub fn normalize_subject_code(code: &str) -> AppResult<String> {
    let normalized = code.trim().to_uppercase();
    if SUBJECT_CODE_PATTERN.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(AppError::validation(
            "Subject code must be 2-4 letters, optionally followed by '-' and up to 3 digits",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_codes() {
        assert_eq!(normalize_subject_code(" math ").unwrap(), "MATH");
        assert_eq!(normalize_subject_code("bio-101").unwrap(), "BIO-101");
        assert_eq!(normalize_subject_code("CS2").unwrap(), "CS2");
        assert!(normalize_subject_code("M").is_err());
        assert!(normalize_subject_code("HISTORY").is_err());
        assert!(normalize_subject_code("BIO-1010").is_err());
    }

    #[test]
    fn grade_levels() {
        assert!(validate_grade_level(1).is_ok());
        assert!(validate_grade_level(13).is_ok());
        assert!(validate_grade_level(0).is_err());
        assert!(validate_grade_level(14).is_err());
    }
}
