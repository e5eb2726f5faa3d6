//! Domain layer: school, learning and gamification models with the rules
//! that act on them. Nothing here touches the database or Redis.

pub mod analytics;
pub mod chat;
pub mod gamification;
pub mod password;
pub mod progress;
pub mod school;
pub mod skill_tree;
pub mod user;

pub use analytics::{ClassSummary, NodeAnalytics, PathAnalytics, SchoolOverview, StudentSnapshot, TeacherDashboard};
pub use chat::{ChatExchange, RuleTutor, Tutor, TutorContext};
pub use gamification::{AchievementContext, AchievementView, Streak, UnlockedAchievement};
pub use password::Password;
pub use progress::{Attempt, MasteryLevel, NodeProgress, SubjectProgress};
pub use school::{
    Class, ClassChanges, Enrollment, NewClass, NewSchool, NewSubject, School, SchoolChanges,
    Subject, SubjectChanges,
};
pub use skill_tree::{
    DifficultyAdjustment, NewSkillNode, NodeAttemptStats, NodeStatus, SkillGraph, SkillGraphError,
    SkillNode, SkillNodeChanges, StudentTreeNode, TreeNode,
};
pub use user::{Actor, NewUser, User, UserResponse, UserRole};
