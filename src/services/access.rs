//! Authorization checks shared by several services.

use uuid::Uuid;

use crate::domain::{Actor, Class, Subject, User, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

/// Load a student of the actor's school whose learning data the actor may
/// read: the student themself, a teacher of one of their classes, or the
/// school owner.
pub(crate) async fn viewable_student<U: UnitOfWork>(
    uow: &U,
    actor: &Actor,
    student_id: Uuid,
) -> AppResult<User> {
    let student = uow.users().find_by_id(student_id).await?.ok_or_not_found()?;
    actor.ensure_same_school(student.school_id)?;
    if !student.is_student() {
        return Err(AppError::NotFound);
    }

    match actor.role {
        UserRole::SchoolOwner => Ok(student),
        UserRole::Teacher => {
            if uow.classes().teaches_student(actor.id, student_id).await? {
                Ok(student)
            } else {
                Err(AppError::Forbidden)
            }
        }
        UserRole::Student if actor.id == student_id => Ok(student),
        UserRole::Student => Err(AppError::Forbidden),
    }
}

/// A subject of the actor's school.
pub(crate) async fn school_subject<U: UnitOfWork>(
    uow: &U,
    actor: &Actor,
    subject_id: Uuid,
) -> AppResult<Subject> {
    let subject = uow.subjects().find_by_id(subject_id).await?.ok_or_not_found()?;
    actor.ensure_same_school(subject.school_id)?;
    Ok(subject)
}

/// A class of the actor's school.
pub(crate) async fn school_class<U: UnitOfWork>(
    uow: &U,
    actor: &Actor,
    class_id: Uuid,
) -> AppResult<Class> {
    let class = uow.classes().find_by_id(class_id).await?.ok_or_not_found()?;
    actor.ensure_same_school(class.school_id)?;
    Ok(class)
}

/// Owners manage every class; teachers only the ones they teach.
pub(crate) fn ensure_manages_class(actor: &Actor, class: &Class) -> AppResult<()> {
    match actor.role {
        UserRole::SchoolOwner => Ok(()),
        UserRole::Teacher if class.teacher_id == Some(actor.id) => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}
