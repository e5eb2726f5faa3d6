//! HTTP request handlers.

pub mod analytics_handler;
pub mod auth_handler;
pub mod chat_handler;
pub mod class_handler;
pub mod gamification_handler;
pub mod progress_handler;
pub mod school_handler;
pub mod skill_tree_handler;
pub mod subject_handler;
pub mod user_handler;

pub use analytics_handler::analytics_routes;
pub use auth_handler::auth_routes;
pub use chat_handler::chat_routes;
pub use class_handler::class_routes;
pub use gamification_handler::{gamification_routes, leaderboard_routes};
pub use progress_handler::{attempt_routes, progress_routes};
pub use school_handler::school_routes;
pub use skill_tree_handler::{node_routes, subject_tree_routes};
pub use subject_handler::subject_routes;
pub use user_handler::user_routes;
