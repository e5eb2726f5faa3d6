//! LearnPath - backend of a school learning platform.
//!
//! Schools register with an owner account, who adds teachers and students,
//! organizes them into classes and defines subjects. Each subject carries a
//! skill tree: nodes linked by prerequisites that students unlock by passing
//! graded attempts. Progress feeds mastery scores, XP, streaks, achievements,
//! class leaderboards and staff analytics.
//!
//! # Layers
//!
//! - **api**: HTTP handlers, middleware and routes
//! - **services**: use cases and access rules
//! - **domain**: models and the rules that act on them
//! - **infra**: PostgreSQL (SeaORM), Redis and the Unit of Work
//! - **cli** / **commands**: `serve`, `migrate` and `calibrate`
//!
//! ```bash
//! learnpath serve
//! learnpath migrate up
//! learnpath calibrate --dry-run
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

pub use api::AppState;
pub use config::Config;
pub use domain::{Actor, Password, User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
