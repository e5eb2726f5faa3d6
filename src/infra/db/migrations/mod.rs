//! Database migrations.
//!
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_schools_and_users;
mod m20240101_000002_create_classes_and_subjects;
mod m20240101_000003_create_skill_tree;
mod m20240101_000004_create_progress;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_schools_and_users::Migration),
            Box::new(m20240101_000002_create_classes_and_subjects::Migration),
            Box::new(m20240101_000003_create_skill_tree::Migration),
            Box::new(m20240101_000004_create_progress::Migration),
        ]
    }
}
