//! Application services: use cases that check who is acting, validate
//! input and orchestrate domain rules over the Unit of Work.

mod access;
mod analytics_service;
mod auth_service;
mod chat_service;
mod class_service;
pub mod container;
mod gamification_service;
mod progress_service;
mod school_service;
mod skill_tree_service;
mod subject_service;
mod user_service;

pub use container::{batch, parallel, Services};

pub use analytics_service::{AnalyticsManager, AnalyticsService};
pub use auth_service::{
    normalize_email, AuthService, Authenticator, Claims, RegisteredSchool, SchoolRegistration,
    TokenResponse,
};
pub use chat_service::{history_key, ChatManager, ChatService};
pub use class_service::{ClassInput, ClassManager, ClassService};
pub use gamification_service::{
    rank_students, GamificationManager, GamificationProfile, GamificationService, LeaderboardEntry,
};
pub use progress_service::{
    AttemptInput, AttemptOutcome, ProgressManager, ProgressService, SubjectProgressReport,
    UnlockedNode,
};
pub use school_service::{SchoolManager, SchoolService};
pub use skill_tree_service::{CalibrationReport, NodeInput, SkillTreeManager, SkillTreeService};
pub use subject_service::{SubjectInput, SubjectManager, SubjectService};
pub use user_service::{NewMember, UserManager, UserService};
