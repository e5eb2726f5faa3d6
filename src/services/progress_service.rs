//! Graded attempts on skill nodes and the progress they build up.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::access::{school_subject, viewable_student};
use crate::domain::gamification::{evaluate_achievements, AchievementDefinition};
use crate::domain::{
    AchievementContext, AchievementView, Actor, Attempt, MasteryLevel, NodeProgress, SkillGraph,
    Streak, SubjectProgress, UnlockedAchievement, UserRole,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{AttemptRecord, UnitOfWork};
use crate::with_transaction;

#[derive(Debug, Clone, Copy)]
pub struct AttemptInput {
    pub correct: i32,
    pub total: i32,
    pub time_spent_minutes: i32,
}

/// A node that became available through an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UnlockedNode {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttemptOutcome {
    pub node_id: Uuid,
    pub school_id: Uuid,
    pub passed: bool,
    pub score: f64,
    /// Node reward plus achievement bonuses
    pub xp_awarded: i64,
    pub newly_unlocked_nodes: Vec<UnlockedNode>,
    pub new_achievements: Vec<AchievementView>,
    pub mastery_score: f64,
    pub mastery_level: MasteryLevel,
    pub streak: Streak,
}

/// A student's standing in one subject.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectProgressReport {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub total_nodes: usize,
    /// Absent until the first attempt
    pub progress: Option<SubjectProgress>,
    pub nodes: Vec<NodeProgress>,
}

#[async_trait]
pub trait ProgressService: Send + Sync {
    /// Grade an attempt by the acting student on `node_id`
    async fn submit_attempt(&self, actor: Actor, node_id: Uuid, input: AttemptInput) -> AppResult<AttemptOutcome>;

    async fn subject_progress(&self, actor: Actor, student_id: Uuid, subject_id: Uuid) -> AppResult<SubjectProgressReport>;

    async fn all_progress(&self, actor: Actor, student_id: Uuid) -> AppResult<Vec<SubjectProgress>>;
}

pub struct ProgressManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> ProgressManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> ProgressService for ProgressManager<U> {
    async fn submit_attempt(&self, actor: Actor, node_id: Uuid, input: AttemptInput) -> AppResult<AttemptOutcome> {
        actor.require_any(&[UserRole::Student])?;
        let attempt = Attempt::new(input.correct, input.total, input.time_spent_minutes)?;

        let node = self.uow.skill_tree().find_node(node_id).await?.ok_or_not_found()?;
        let subject_id = node.subject_id;
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;
        let graph = SkillGraph::new(self.uow.skill_tree().list_nodes(subject_id).await?)?;

        let student_id = actor.id;
        let school_id = actor.school_id;
        let node_reward = node.xp_reward as i64;

        let outcome = with_transaction!(self.uow, |ctx| {
            // Held until commit, so attempts by one student apply one at a time
            let student = ctx.users().lock(student_id).await?.ok_or_not_found()?;
            let progress = ctx.progress();
            let records = progress.node_progress(student_id, subject_id).await?;

            let completed: HashSet<Uuid> = records
                .iter()
                .filter(|p| p.is_completed() && graph.get(p.node_id).is_some())
                .map(|p| p.node_id)
                .collect();

            let missing = graph.missing_prerequisites(node_id, &completed)?;
            if !missing.is_empty() {
                let titles: Vec<&str> = missing.iter().map(|n| n.title.as_str()).collect();
                return Err(AppError::validation(format!(
                    "Prerequisites not completed: {}",
                    titles.join(", ")
                )));
            }

            let now = Utc::now();
            let mut node_progress = records
                .iter()
                .find(|p| p.node_id == node_id)
                .cloned()
                .unwrap_or_else(|| NodeProgress::start(student_id, node_id, subject_id, now));
            let first_completion = node_progress.record(&attempt, now);

            let newly_unlocked = if first_completion {
                graph.newly_unlocked(node_id, &completed)
            } else {
                Vec::new()
            };
            let completed_count = completed.len() + usize::from(first_completion);

            let mut subject_progress = progress
                .subject_progress(student_id, subject_id)
                .await?
                .unwrap_or_else(|| SubjectProgress::start(student_id, subject_id, now));
            subject_progress.record(&attempt, completed_count as i32, graph.len(), now);

            let mut streak = progress
                .streak(student_id)
                .await?
                .unwrap_or_else(|| Streak::new(student_id));
            streak.record_activity(now.date_naive());

            // Other subjects count towards node and mastery achievements too
            let other_subjects: Vec<SubjectProgress> = progress
                .all_subject_progress(student_id)
                .await?
                .into_iter()
                .filter(|p| p.subject_id != subject_id)
                .collect();
            let nodes_completed = other_subjects
                .iter()
                .map(|p| p.completed_nodes as i64)
                .sum::<i64>()
                + subject_progress.completed_nodes as i64;
            let mastered_subjects = other_subjects
                .iter()
                .chain(std::iter::once(&subject_progress))
                .filter(|p| p.mastery_level == MasteryLevel::Master)
                .count();

            let node_xp = if first_completion { node_reward } else { 0 };
            let context = AchievementContext {
                nodes_completed,
                current_streak: streak.current,
                total_xp: student.xp + node_xp,
                perfect_attempt: attempt.is_perfect(),
                mastered_subjects,
            };
            let unlocked: HashSet<String> = progress
                .achievements(student_id)
                .await?
                .into_iter()
                .map(|a| a.code)
                .collect();
            let earned: Vec<&'static AchievementDefinition> = evaluate_achievements(&context, &unlocked);
            let bonus_xp: i64 = earned.iter().map(|a| a.bonus_xp).sum();
            let xp_gain = node_xp + bonus_xp;

            progress
                .record_attempt(AttemptRecord {
                    node: node_progress,
                    subject: subject_progress.clone(),
                    streak: streak.clone(),
                    achievements: earned
                        .iter()
                        .map(|a| UnlockedAchievement {
                            student_id,
                            code: a.code.to_string(),
                            unlocked_at: now,
                        })
                        .collect(),
                    xp_gain,
                })
                .await?;

            Ok(AttemptOutcome {
                node_id,
                school_id,
                passed: attempt.passed(),
                score: attempt.score(),
                xp_awarded: xp_gain,
                newly_unlocked_nodes: newly_unlocked
                    .into_iter()
                    .filter_map(|id| graph.get(id))
                    .map(|n| UnlockedNode {
                        id: n.id,
                        title: n.title.clone(),
                    })
                    .collect(),
                new_achievements: earned
                    .into_iter()
                    .map(|a| AchievementView::of(a, Some(now)))
                    .collect(),
                mastery_score: subject_progress.mastery_score,
                mastery_level: subject_progress.mastery_level,
                streak,
            })
        })?;

        tracing::info!(
            student_id = %student_id,
            node_id = %node_id,
            passed = outcome.passed,
            xp = outcome.xp_awarded,
            "Attempt recorded"
        );
        Ok(outcome)
    }

    async fn subject_progress(&self, actor: Actor, student_id: Uuid, subject_id: Uuid) -> AppResult<SubjectProgressReport> {
        viewable_student(self.uow.as_ref(), &actor, student_id).await?;
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;

        let total_nodes = self.uow.skill_tree().list_nodes(subject_id).await?.len();
        let progress = self.uow.progress();
        let summary = progress.subject_progress(student_id, subject_id).await?;
        let nodes = progress.node_progress(student_id, subject_id).await?;

        Ok(SubjectProgressReport {
            student_id,
            subject_id,
            total_nodes,
            progress: summary,
            nodes,
        })
    }

    async fn all_progress(&self, actor: Actor, student_id: Uuid) -> AppResult<Vec<SubjectProgress>> {
        viewable_student(self.uow.as_ref(), &actor, student_id).await?;
        self.uow.progress().all_subject_progress(student_id).await
    }
}
