//! Repository layer - Data access abstraction
//!
//! Each repository is a trait (mockable in tests) with a `*Store`
//! implementation over a SeaORM connection.

pub(crate) mod entities;
mod class_repository;
mod progress_repository;
mod school_repository;
mod skill_tree_repository;
mod subject_repository;
mod user_repository;

pub use class_repository::{ClassRepository, ClassStore};
pub use progress_repository::{AttemptRecord, ProgressRepository, ProgressStore};
pub use school_repository::{SchoolRepository, SchoolStore};
pub use skill_tree_repository::{SkillTreeRepository, SkillTreeStore};
pub use subject_repository::{SubjectRepository, SubjectStore};
pub use user_repository::{UserRepository, UserStore};

pub(crate) use progress_repository::{
    load_achievements, load_all_subject_progress, load_node_progress, load_streak,
    load_subject_progress, write_attempt,
};
pub(crate) use school_repository::insert_school;
pub(crate) use skill_tree_repository::{apply_node_changes, insert_node, load_nodes, lock_subject};
pub(crate) use user_repository::{find_user_by_email_with_deleted, insert_user, lock_user};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use class_repository::MockClassRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use progress_repository::MockProgressRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use school_repository::MockSchoolRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use skill_tree_repository::MockSkillTreeRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use subject_repository::MockSubjectRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
