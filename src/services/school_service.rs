//! The actor's own school.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{Actor, School, SchoolChanges, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

#[async_trait]
pub trait SchoolService: Send + Sync {
    async fn get_school(&self, actor: Actor) -> AppResult<School>;

    /// Owner only
    async fn update_school(&self, actor: Actor, changes: SchoolChanges) -> AppResult<School>;
}

pub struct SchoolManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> SchoolManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> SchoolService for SchoolManager<U> {
    async fn get_school(&self, actor: Actor) -> AppResult<School> {
        self.uow.schools().find_by_id(actor.school_id).await?.ok_or_not_found()
    }

    async fn update_school(&self, actor: Actor, mut changes: SchoolChanges) -> AppResult<School> {
        actor.require_any(&[UserRole::SchoolOwner])?;

        if let Some(name) = changes.name.take() {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::validation("School name cannot be empty"));
            }
            changes.name = Some(name);
        }

        self.uow.schools().update(actor.school_id, changes).await
    }
}
