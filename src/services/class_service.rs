//! Classes, their teacher and their enrolled students.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::access::{ensure_manages_class, school_class};
use crate::domain::school::validate_grade_level;
use crate::domain::{Actor, Class, ClassChanges, NewClass, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[derive(Debug, Clone)]
pub struct ClassInput {
    pub name: String,
    pub grade_level: i32,
    pub teacher_id: Option<Uuid>,
}

#[async_trait]
pub trait ClassService: Send + Sync {
    async fn create_class(&self, actor: Actor, input: ClassInput) -> AppResult<Class>;

    /// Owners see every class, teachers the ones they teach, students the
    /// ones they are enrolled in.
    async fn list_classes(&self, actor: Actor) -> AppResult<Vec<Class>>;

    async fn get_class(&self, actor: Actor, id: Uuid) -> AppResult<Class>;

    async fn update_class(&self, actor: Actor, id: Uuid, changes: ClassChanges) -> AppResult<Class>;

    async fn delete_class(&self, actor: Actor, id: Uuid) -> AppResult<()>;

    /// Set or clear the class teacher
    async fn assign_teacher(&self, actor: Actor, id: Uuid, teacher_id: Option<Uuid>) -> AppResult<Class>;

    /// Enroll students; already enrolled ones are left alone
    async fn enroll_students(&self, actor: Actor, id: Uuid, student_ids: Vec<Uuid>) -> AppResult<Vec<User>>;

    async fn remove_student(&self, actor: Actor, id: Uuid, student_id: Uuid) -> AppResult<()>;

    async fn list_students(&self, actor: Actor, id: Uuid) -> AppResult<Vec<User>>;
}

pub struct ClassManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ClassManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn ensure_teacher(&self, actor: &Actor, teacher_id: Uuid) -> AppResult<()> {
        match self.uow.users().find_by_id(teacher_id).await? {
            Some(user) if user.school_id == actor.school_id && user.is_teacher() => Ok(()),
            _ => Err(AppError::validation("Teacher not found in this school")),
        }
    }
}

fn clean_class_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Class name is required"));
    }
    Ok(name.to_string())
}

#[async_trait]
impl<U: UnitOfWork> ClassService for ClassManager<U> {
    async fn create_class(&self, actor: Actor, input: ClassInput) -> AppResult<Class> {
        actor.require_any(&[UserRole::SchoolOwner])?;
        validate_grade_level(input.grade_level)?;
        if let Some(teacher_id) = input.teacher_id {
            self.ensure_teacher(&actor, teacher_id).await?;
        }

        let class = self
            .uow
            .classes()
            .create(NewClass {
                school_id: actor.school_id,
                name: clean_class_name(&input.name)?,
                grade_level: input.grade_level,
                teacher_id: input.teacher_id,
            })
            .await?;

        tracing::info!(class_id = %class.id, school_id = %class.school_id, "Class created");
        Ok(class)
    }

    async fn list_classes(&self, actor: Actor) -> AppResult<Vec<Class>> {
        let classes = self.uow.classes();
        match actor.role {
            UserRole::SchoolOwner => classes.list_by_school(actor.school_id).await,
            UserRole::Teacher => classes.list_by_teacher(actor.id).await,
            UserRole::Student => classes.list_by_student(actor.id).await,
        }
    }

    async fn get_class(&self, actor: Actor, id: Uuid) -> AppResult<Class> {
        let class = school_class(self.uow.as_ref(), &actor, id).await?;
        if actor.is_student() {
            let enrolled = self.uow.classes().student_ids(id).await?;
            if !enrolled.contains(&actor.id) {
                return Err(AppError::Forbidden);
            }
        }
        Ok(class)
    }

    async fn update_class(&self, actor: Actor, id: Uuid, mut changes: ClassChanges) -> AppResult<Class> {
        actor.require_any(&[UserRole::SchoolOwner])?;
        school_class(self.uow.as_ref(), &actor, id).await?;

        if let Some(grade_level) = changes.grade_level {
            validate_grade_level(grade_level)?;
        }
        if let Some(name) = changes.name.take() {
            changes.name = Some(clean_class_name(&name)?);
        }

        self.uow.classes().update(id, changes).await
    }

    async fn delete_class(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        actor.require_any(&[UserRole::SchoolOwner])?;
        school_class(self.uow.as_ref(), &actor, id).await?;

        self.uow.classes().delete(id).await?;
        tracing::info!(class_id = %id, "Class deleted");
        Ok(())
    }

    async fn assign_teacher(&self, actor: Actor, id: Uuid, teacher_id: Option<Uuid>) -> AppResult<Class> {
        actor.require_any(&[UserRole::SchoolOwner])?;
        school_class(self.uow.as_ref(), &actor, id).await?;
        if let Some(teacher_id) = teacher_id {
            self.ensure_teacher(&actor, teacher_id).await?;
        }

        self.uow.classes().set_teacher(id, teacher_id).await
    }

    async fn enroll_students(&self, actor: Actor, id: Uuid, student_ids: Vec<Uuid>) -> AppResult<Vec<User>> {
        let class = school_class(self.uow.as_ref(), &actor, id).await?;
        ensure_manages_class(&actor, &class)?;

        let mut seen = HashSet::new();
        let requested: Vec<Uuid> = student_ids.into_iter().filter(|s| seen.insert(*s)).collect();
        if requested.is_empty() {
            return Err(AppError::validation("At least one student is required"));
        }

        let students: Vec<User> = self
            .uow
            .users()
            .find_many(requested.clone())
            .await?
            .into_iter()
            .filter(|u| u.school_id == actor.school_id && u.is_student())
            .collect();

        let found: HashSet<Uuid> = students.iter().map(|s| s.id).collect();
        let unknown: Vec<String> = requested
            .iter()
            .filter(|id| !found.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::validation(format!(
                "Not students of this school: {}",
                unknown.join(", ")
            )));
        }

        self.uow.classes().enroll(id, requested).await?;
        tracing::info!(class_id = %id, count = students.len(), "Students enrolled");
        Ok(students)
    }

    async fn remove_student(&self, actor: Actor, id: Uuid, student_id: Uuid) -> AppResult<()> {
        let class = school_class(self.uow.as_ref(), &actor, id).await?;
        ensure_manages_class(&actor, &class)?;

        if !self.uow.classes().remove_student(id, student_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn list_students(&self, actor: Actor, id: Uuid) -> AppResult<Vec<User>> {
        let class = school_class(self.uow.as_ref(), &actor, id).await?;
        ensure_manages_class(&actor, &class)?;

        let ids = self.uow.classes().student_ids(id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut students = self.uow.users().find_many(ids).await?;
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }
}
