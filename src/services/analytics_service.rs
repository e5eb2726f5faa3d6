//! School, teacher and learning-path reports.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::access::school_subject;
use super::container::parallel;
use crate::domain::analytics::{
    active_students, average_mastery, members_by_class, path_analytics, struggling_students,
    student_snapshots, summarize_class, top_students,
};
use crate::domain::{Actor, Class, PathAnalytics, SchoolOverview, TeacherDashboard, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

#[async_trait]
pub trait AnalyticsService: Send + Sync {
    /// Owner only
    async fn school_overview(&self, actor: Actor) -> AppResult<SchoolOverview>;

    /// A teacher's own dashboard, or any teacher's for the owner
    async fn teacher_dashboard(&self, actor: Actor, teacher_id: Uuid) -> AppResult<TeacherDashboard>;

    async fn path_analytics(&self, actor: Actor, subject_id: Uuid) -> AppResult<PathAnalytics>;
}

pub struct AnalyticsManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> AnalyticsManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Enrolled student ids, in the order of `classes`.
    async fn class_members(&self, classes: &[Class]) -> AppResult<Vec<Vec<Uuid>>> {
        if classes.is_empty() {
            return Ok(Vec::new());
        }
        let class_ids: Vec<Uuid> = classes.iter().map(|c| c.id).collect();
        let enrollments = self.uow.classes().enrollments(class_ids).await?;
        let mut members = members_by_class(&enrollments);

        Ok(classes
            .iter()
            .map(|c| members.remove(&c.id).unwrap_or_default())
            .collect())
    }
}

#[async_trait]
impl<U: UnitOfWork> AnalyticsService for AnalyticsManager<U> {
    async fn school_overview(&self, actor: Actor) -> AppResult<SchoolOverview> {
        actor.require_any(&[UserRole::SchoolOwner])?;
        let school_id = actor.school_id;

        let users = self.uow.users();
        let classes_repo = self.uow.classes();
        let subjects = self.uow.subjects();
        let (teacher_count, students, classes, subject_count) = parallel::join4(
            users.count_by_role(school_id, UserRole::Teacher),
            users.list_by_role(school_id, UserRole::Student),
            classes_repo.list_by_school(school_id),
            subjects.count_by_school(school_id),
        )
        .await?;

        let student_ids: Vec<Uuid> = students.iter().map(|s| s.id).collect();
        let progress = self
            .uow
            .progress()
            .subject_progress_for_students(student_ids)
            .await?;
        let members = self.class_members(&classes).await?;

        let summaries = classes
            .iter()
            .zip(members.iter())
            .map(|(class, ids)| summarize_class(class, ids, &progress))
            .collect();

        Ok(SchoolOverview {
            school_id,
            teacher_count,
            student_count: students.len() as u64,
            class_count: classes.len(),
            subject_count: subject_count as usize,
            active_students: active_students(&progress, Utc::now()),
            average_mastery: average_mastery(&progress),
            classes: summaries,
        })
    }

    async fn teacher_dashboard(&self, actor: Actor, teacher_id: Uuid) -> AppResult<TeacherDashboard> {
        match actor.role {
            UserRole::Teacher if actor.id == teacher_id => {}
            UserRole::SchoolOwner => match self.uow.users().find_by_id(teacher_id).await? {
                Some(user) if user.school_id == actor.school_id && user.is_teacher() => {}
                _ => return Err(AppError::NotFound),
            },
            _ => return Err(AppError::Forbidden),
        }

        let classes = self.uow.classes().list_by_teacher(teacher_id).await?;
        let members = self.class_members(&classes).await?;

        let student_ids: Vec<Uuid> = members
            .iter()
            .flatten()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let (students, progress) = if student_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            parallel::join2(
                self.uow.users().find_many(student_ids.clone()),
                self.uow.progress().subject_progress_for_students(student_ids),
            )
            .await?
        };
        let snapshots = student_snapshots(&students, &progress);

        Ok(TeacherDashboard {
            teacher_id,
            classes: classes
                .iter()
                .zip(members.iter())
                .map(|(class, ids)| summarize_class(class, ids, &progress))
                .collect(),
            struggling_students: struggling_students(&snapshots),
            top_students: top_students(&snapshots),
        })
    }

    async fn path_analytics(&self, actor: Actor, subject_id: Uuid) -> AppResult<PathAnalytics> {
        actor.require_staff()?;
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;

        let skill_tree = self.uow.skill_tree();
        let progress = self.uow.progress();
        let (nodes, records) = parallel::join2(
            skill_tree.list_nodes(subject_id),
            progress.node_progress_for_subject(subject_id),
        )
        .await?;

        Ok(path_analytics(subject_id, &nodes, &records))
    }
}
