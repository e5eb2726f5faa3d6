//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod class;
pub mod class_student;
pub mod node_progress;
pub mod school;
pub mod skill_edge;
pub mod skill_node;
pub mod streak;
pub mod student_achievement;
pub mod subject;
pub mod subject_progress;
pub mod user;
