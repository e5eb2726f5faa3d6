//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_SCHOOL_OWNER, ROLE_STUDENT, ROLE_TEACHER, VALID_ROLES};
use crate::errors::{AppError, AppResult};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SchoolOwner,
    Teacher,
    Student,
}

impl UserRole {
    /// Owners and teachers manage school content
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::SchoolOwner | UserRole::Teacher)
    }

    /// Check whether this role may create accounts with the `target` role.
    pub fn can_create(&self, target: UserRole) -> bool {
        match self {
            UserRole::SchoolOwner => matches!(target, UserRole::Teacher | UserRole::Student),
            UserRole::Teacher => matches!(target, UserRole::Student),
            UserRole::Student => false,
        }
    }

    /// Parse a stored role value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            ROLE_SCHOOL_OWNER => Ok(UserRole::SchoolOwner),
            ROLE_TEACHER => Ok(UserRole::Teacher),
            ROLE_STUDENT => Ok(UserRole::Student),
            other => Err(AppError::validation(format!(
                "Invalid role '{}'. Must be one of: {}",
                other,
                VALID_ROLES.join(", ")
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SchoolOwner => ROLE_SCHOOL_OWNER,
            UserRole::Teacher => ROLE_TEACHER,
            UserRole::Student => ROLE_STUDENT,
        }
    }
}

impl From<&str> for UserRole {
    /// Lenient conversion for values read back from storage; unknown values
    /// fall back to the least privileged role.
    fn from(s: &str) -> Self {
        UserRole::parse(s).unwrap_or(UserRole::Student)
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub school_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    /// Experience points earned through learning
    pub xp: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }

    /// Check if user is soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data needed to insert a user row
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: Uuid,
    pub school_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
}

/// The authenticated caller, as seen by services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
    pub school_id: Uuid,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole, school_id: Uuid) -> Self {
        Self { id, role, school_id }
    }

    pub fn is_owner(&self) -> bool {
        self.role == UserRole::SchoolOwner
    }

    pub fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    /// Require one of the given roles.
    pub fn require_any(&self, roles: &[UserRole]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Require owner or teacher.
    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Entities of another school are reported as missing, not forbidden.
    pub fn ensure_same_school(&self, school_id: Uuid) -> AppResult<()> {
        if self.school_id == school_id {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub school_id: Uuid,
    #[schema(example = "teacher@school.edu")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub role: UserRole,
    #[schema(example = 1250)]
    pub xp: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            school_id: user.school_id,
            email: user.email,
            name: user.name,
            role: user.role,
            xp: user.xp,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip_through_storage_strings() {
        for role in [UserRole::SchoolOwner, UserRole::Teacher, UserRole::Student] {
            assert_eq!(UserRole::parse(role.as_str()).unwrap(), role);
        }
        assert!(UserRole::parse("admin").is_err());
        assert_eq!(UserRole::from("garbage"), UserRole::Student);
    }

    #[test]
    fn role_serializes_in_snake_case() {
        let json = serde_json::to_string(&UserRole::SchoolOwner).unwrap();
        assert_eq!(json, "\"school_owner\"");
    }

    #[test]
    fn account_creation_rules() {
        assert!(UserRole::SchoolOwner.can_create(UserRole::Teacher));
        assert!(UserRole::SchoolOwner.can_create(UserRole::Student));
        assert!(!UserRole::SchoolOwner.can_create(UserRole::SchoolOwner));
        assert!(UserRole::Teacher.can_create(UserRole::Student));
        assert!(!UserRole::Teacher.can_create(UserRole::Teacher));
        assert!(!UserRole::Student.can_create(UserRole::Student));
    }

    #[test]
    fn actor_of_other_school_sees_not_found() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::Teacher, Uuid::new_v4());
        assert!(matches!(
            actor.ensure_same_school(Uuid::new_v4()),
            Err(AppError::NotFound)
        ));
        assert!(actor.ensure_same_school(actor.school_id).is_ok());
    }

    #[test]
    fn staff_requirement() {
        let student = Actor::new(Uuid::new_v4(), UserRole::Student, Uuid::new_v4());
        assert!(matches!(student.require_staff(), Err(AppError::Forbidden)));
        let owner = Actor::new(Uuid::new_v4(), UserRole::SchoolOwner, Uuid::new_v4());
        assert!(owner.require_staff().is_ok());
        assert!(owner.require_any(&[UserRole::SchoolOwner]).is_ok());
        assert!(owner.require_any(&[UserRole::Teacher]).is_err());
    }
}
