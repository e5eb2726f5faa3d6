//! Subjects taught at a school.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::access::school_subject;
use crate::domain::school::normalize_subject_code;
use crate::domain::{Actor, NewSubject, Subject, SubjectChanges};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[derive(Debug, Clone)]
pub struct SubjectInput {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait SubjectService: Send + Sync {
    async fn create_subject(&self, actor: Actor, input: SubjectInput) -> AppResult<Subject>;

    async fn list_subjects(&self, actor: Actor) -> AppResult<Vec<Subject>>;

    async fn get_subject(&self, actor: Actor, id: Uuid) -> AppResult<Subject>;

    async fn update_subject(&self, actor: Actor, id: Uuid, changes: SubjectChanges) -> AppResult<Subject>;

    /// Removes the subject with its skill tree and progress
    async fn delete_subject(&self, actor: Actor, id: Uuid) -> AppResult<()>;
}

pub struct SubjectManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> SubjectManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Codes are unique per school.
    async fn ensure_code_free(&self, school_id: Uuid, code: &str, except: Option<Uuid>) -> AppResult<()> {
        match self.uow.subjects().find_by_code(school_id, code).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict("Subject code")),
            _ => Ok(()),
        }
    }
}

fn clean_subject_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Subject name is required"));
    }
    Ok(name.to_string())
}

#[async_trait]
impl<U: UnitOfWork> SubjectService for SubjectManager<U> {
    async fn create_subject(&self, actor: Actor, input: SubjectInput) -> AppResult<Subject> {
        actor.require_staff()?;
        let code = normalize_subject_code(&input.code)?;
        let name = clean_subject_name(&input.name)?;
        self.ensure_code_free(actor.school_id, &code, None).await?;

        let subject = self
            .uow
            .subjects()
            .create(NewSubject {
                school_id: actor.school_id,
                name,
                code,
                description: input.description,
            })
            .await?;

        tracing::info!(subject_id = %subject.id, code = %subject.code, "Subject created");
        Ok(subject)
    }

    async fn list_subjects(&self, actor: Actor) -> AppResult<Vec<Subject>> {
        self.uow.subjects().list_by_school(actor.school_id).await
    }

    async fn get_subject(&self, actor: Actor, id: Uuid) -> AppResult<Subject> {
        school_subject(self.uow.as_ref(), &actor, id).await
    }

    async fn update_subject(&self, actor: Actor, id: Uuid, mut changes: SubjectChanges) -> AppResult<Subject> {
        actor.require_staff()?;
        school_subject(self.uow.as_ref(), &actor, id).await?;

        if let Some(code) = changes.code.take() {
            let code = normalize_subject_code(&code)?;
            self.ensure_code_free(actor.school_id, &code, Some(id)).await?;
            changes.code = Some(code);
        }
        if let Some(name) = changes.name.take() {
            changes.name = Some(clean_subject_name(&name)?);
        }

        self.uow.subjects().update(id, changes).await
    }

    async fn delete_subject(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        actor.require_staff()?;
        school_subject(self.uow.as_ref(), &actor, id).await?;

        self.uow.subjects().delete(id).await?;
        tracing::info!(subject_id = %id, "Subject deleted");
        Ok(())
    }
}
