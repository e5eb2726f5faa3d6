//! School membership: creating and managing the people of a school.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::auth_service::normalize_email;
use crate::domain::{Actor, NewUser, Password, User, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::PaginationParams;

#[derive(Debug, Clone)]
pub struct NewMember {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
}

/// Member operations, always scoped to the actor's school.
///
/// Members of another school are reported as not found.
#[async_trait]
pub trait UserService: Send + Sync {
    /// The actor's own profile
    async fn me(&self, actor: Actor) -> AppResult<User>;

    async fn create_member(&self, actor: Actor, member: NewMember) -> AppResult<User>;

    async fn list_members(
        &self,
        actor: Actor,
        role: Option<UserRole>,
        params: PaginationParams,
    ) -> AppResult<(Vec<User>, u64)>;

    async fn get_member(&self, actor: Actor, id: Uuid) -> AppResult<User>;

    async fn update_member(&self, actor: Actor, id: Uuid, name: String) -> AppResult<User>;

    /// Soft delete
    async fn delete_member(&self, actor: Actor, id: Uuid) -> AppResult<()>;

    async fn restore_member(&self, actor: Actor, id: Uuid) -> AppResult<User>;
}

pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn member(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        let user = self.uow.users().find_by_id(id).await?.ok_or_not_found()?;
        actor.ensure_same_school(user.school_id)?;
        Ok(user)
    }
}

fn ensure_manages(actor: &Actor, target: &User) -> AppResult<()> {
    if actor.role.can_create(target.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    Ok(name.to_string())
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn me(&self, actor: Actor) -> AppResult<User> {
        self.uow.users().find_by_id(actor.id).await?.ok_or_not_found()
    }

    async fn create_member(&self, actor: Actor, member: NewMember) -> AppResult<User> {
        if !actor.role.can_create(member.role) {
            return Err(AppError::Forbidden);
        }

        let email = normalize_email(&member.email);
        if self.uow.users().find_by_email_with_deleted(&email).await?.is_some() {
            return Err(AppError::Conflict("User".to_string()));
        }

        let password_hash = Password::new(&member.password)?.into_string();
        let user = self
            .uow
            .users()
            .create(NewUser {
                id: Uuid::new_v4(),
                school_id: actor.school_id,
                email,
                password_hash,
                name: clean_name(&member.name)?,
                role: member.role,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, created_by = %actor.id, "Member created");
        Ok(user)
    }

    async fn list_members(
        &self,
        actor: Actor,
        role: Option<UserRole>,
        params: PaginationParams,
    ) -> AppResult<(Vec<User>, u64)> {
        actor.require_staff()?;
        self.uow.users().list_by_school(actor.school_id, role, params).await
    }

    async fn get_member(&self, actor: Actor, id: Uuid) -> AppResult<User> {
        let user = self.member(&actor, id).await?;
        // Students only see staff and themselves
        if actor.is_student() && user.is_student() && user.id != actor.id {
            return Err(AppError::Forbidden);
        }
        Ok(user)
    }

    async fn update_member(&self, actor: Actor, id: Uuid, name: String) -> AppResult<User> {
        let user = self.member(&actor, id).await?;
        if user.id != actor.id {
            ensure_manages(&actor, &user)?;
        }
        self.uow.users().update_name(id, clean_name(&name)?).await
    }

    async fn delete_member(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        if actor.id == id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        let user = self.member(&actor, id).await?;
        ensure_manages(&actor, &user)?;

        self.uow.users().delete(id).await?;
        tracing::info!(user_id = %id, deleted_by = %actor.id, "Member deleted");
        Ok(())
    }

    async fn restore_member(&self, actor: Actor, id: Uuid) -> AppResult<User> {
        let user = self
            .uow
            .users()
            .find_by_id_with_deleted(id)
            .await?
            .ok_or_not_found()?;
        actor.ensure_same_school(user.school_id)?;
        ensure_manages(&actor, &user)?;
        if !user.is_deleted() {
            return Err(AppError::bad_request("Member is not deleted"));
        }

        self.uow.users().restore(id).await
    }
}
