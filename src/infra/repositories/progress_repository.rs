//! Student progress, streaks and unlocked achievements.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::{node_progress, streak, student_achievement, subject_progress};
use super::user_repository::add_xp;
use crate::domain::{NodeProgress, Streak, SubjectProgress, UnlockedAchievement};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Everything one graded attempt changes.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub node: NodeProgress,
    pub subject: SubjectProgress,
    pub streak: Streak,
    pub achievements: Vec<UnlockedAchievement>,
    pub xp_gain: i64,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn find_node_progress(&self, student_id: Uuid, node_id: Uuid) -> AppResult<Option<NodeProgress>>;

    /// A student's node records within one subject
    async fn node_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Vec<NodeProgress>>;

    /// Every student's node records within one subject
    async fn node_progress_for_subject(&self, subject_id: Uuid) -> AppResult<Vec<NodeProgress>>;

    async fn subject_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Option<SubjectProgress>>;

    async fn all_subject_progress(&self, student_id: Uuid) -> AppResult<Vec<SubjectProgress>>;

    async fn subject_progress_for_students(&self, student_ids: Vec<Uuid>) -> AppResult<Vec<SubjectProgress>>;

    async fn streak(&self, student_id: Uuid) -> AppResult<Option<Streak>>;

    async fn achievements(&self, student_id: Uuid) -> AppResult<Vec<UnlockedAchievement>>;
}

pub struct ProgressStore {
    db: DatabaseConnection,
}

impl ProgressStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn node_model(p: NodeProgress) -> node_progress::ActiveModel {
    node_progress::ActiveModel {
        student_id: Set(p.student_id),
        node_id: Set(p.node_id),
        subject_id: Set(p.subject_id),
        status: Set(p.status.as_str().to_string()),
        attempts: Set(p.attempts),
        passes: Set(p.passes),
        best_score: Set(p.best_score),
        last_attempt_at: Set(p.last_attempt_at),
        completed_at: Set(p.completed_at),
    }
}

fn subject_model(p: SubjectProgress) -> subject_progress::ActiveModel {
    subject_progress::ActiveModel {
        student_id: Set(p.student_id),
        subject_id: Set(p.subject_id),
        completed_nodes: Set(p.completed_nodes),
        total_attempts: Set(p.total_attempts),
        correct_answers: Set(p.correct_answers),
        time_spent_minutes: Set(p.time_spent_minutes),
        mastery_score: Set(p.mastery_score),
        mastery_level: Set(p.mastery_level.as_str().to_string()),
        last_activity_at: Set(p.last_activity_at),
    }
}

/// A student's node records within one subject, on any connection.
pub(crate) async fn load_node_progress<C: ConnectionTrait>(
    db: &C,
    student_id: Uuid,
    subject_id: Uuid,
) -> AppResult<Vec<NodeProgress>> {
    let models = node_progress::Entity::find()
        .filter(node_progress::Column::StudentId.eq(student_id))
        .filter(node_progress::Column::SubjectId.eq(subject_id))
        .all(db)
        .await?;
    Ok(models.into_iter().map(NodeProgress::from).collect())
}

pub(crate) async fn load_subject_progress<C: ConnectionTrait>(
    db: &C,
    student_id: Uuid,
    subject_id: Uuid,
) -> AppResult<Option<SubjectProgress>> {
    let result = subject_progress::Entity::find_by_id((student_id, subject_id))
        .one(db)
        .await
        .map_err(AppError::from)?;
    Ok(result.map(SubjectProgress::from))
}

pub(crate) async fn load_all_subject_progress<C: ConnectionTrait>(
    db: &C,
    student_id: Uuid,
) -> AppResult<Vec<SubjectProgress>> {
    let models = subject_progress::Entity::find()
        .filter(subject_progress::Column::StudentId.eq(student_id))
        .order_by_desc(subject_progress::Column::LastActivityAt)
        .all(db)
        .await?;
    Ok(models.into_iter().map(SubjectProgress::from).collect())
}

pub(crate) async fn load_streak<C: ConnectionTrait>(db: &C, student_id: Uuid) -> AppResult<Option<Streak>> {
    let result = streak::Entity::find_by_id(student_id)
        .one(db)
        .await
        .map_err(AppError::from)?;
    Ok(result.map(Streak::from))
}

pub(crate) async fn load_achievements<C: ConnectionTrait>(
    db: &C,
    student_id: Uuid,
) -> AppResult<Vec<UnlockedAchievement>> {
    let models = student_achievement::Entity::find()
        .filter(student_achievement::Column::StudentId.eq(student_id))
        .order_by_asc(student_achievement::Column::UnlockedAt)
        .all(db)
        .await?;
    Ok(models.into_iter().map(UnlockedAchievement::from).collect())
}

/// Upsert every row an attempt touches and add the XP gain.
///
/// Rows are written as absolute values, so the caller must hold the
/// student's row lock from the reads they were computed from until commit.
pub(crate) async fn write_attempt<C: ConnectionTrait>(db: &C, record: AttemptRecord) -> AppResult<()> {
    let student_id = record.node.student_id;

    node_progress::Entity::insert(node_model(record.node))
        .on_conflict(
            OnConflict::columns([node_progress::Column::StudentId, node_progress::Column::NodeId])
                .update_columns([
                    node_progress::Column::Status,
                    node_progress::Column::Attempts,
                    node_progress::Column::Passes,
                    node_progress::Column::BestScore,
                    node_progress::Column::LastAttemptAt,
                    node_progress::Column::CompletedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    subject_progress::Entity::insert(subject_model(record.subject))
        .on_conflict(
            OnConflict::columns([
                subject_progress::Column::StudentId,
                subject_progress::Column::SubjectId,
            ])
            .update_columns([
                subject_progress::Column::CompletedNodes,
                subject_progress::Column::TotalAttempts,
                subject_progress::Column::CorrectAnswers,
                subject_progress::Column::TimeSpentMinutes,
                subject_progress::Column::MasteryScore,
                subject_progress::Column::MasteryLevel,
                subject_progress::Column::LastActivityAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let streak_row = streak::ActiveModel {
        student_id: Set(record.streak.student_id),
        current: Set(record.streak.current),
        longest: Set(record.streak.longest),
        last_active_date: Set(record.streak.last_active_date),
    };
    streak::Entity::insert(streak_row)
        .on_conflict(
            OnConflict::column(streak::Column::StudentId)
                .update_columns([
                    streak::Column::Current,
                    streak::Column::Longest,
                    streak::Column::LastActiveDate,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if !record.achievements.is_empty() {
        let rows = record.achievements.into_iter().map(|a| student_achievement::ActiveModel {
            student_id: Set(a.student_id),
            code: Set(a.code),
            unlocked_at: Set(a.unlocked_at),
        });
        student_achievement::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    student_achievement::Column::StudentId,
                    student_achievement::Column::Code,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    add_xp(db, student_id, record.xp_gain).await
}

#[async_trait]
impl ProgressRepository for ProgressStore {
    async fn find_node_progress(&self, student_id: Uuid, node_id: Uuid) -> AppResult<Option<NodeProgress>> {
        let result = node_progress::Entity::find_by_id((student_id, node_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.map(NodeProgress::from))
    }

    async fn node_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Vec<NodeProgress>> {
        load_node_progress(&self.db, student_id, subject_id).await
    }

    async fn node_progress_for_subject(&self, subject_id: Uuid) -> AppResult<Vec<NodeProgress>> {
        let models = node_progress::Entity::find()
            .filter(node_progress::Column::SubjectId.eq(subject_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(NodeProgress::from).collect())
    }

    async fn subject_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Option<SubjectProgress>> {
        load_subject_progress(&self.db, student_id, subject_id).await
    }

    async fn all_subject_progress(&self, student_id: Uuid) -> AppResult<Vec<SubjectProgress>> {
        load_all_subject_progress(&self.db, student_id).await
    }

    async fn subject_progress_for_students(&self, student_ids: Vec<Uuid>) -> AppResult<Vec<SubjectProgress>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = subject_progress::Entity::find()
            .filter(subject_progress::Column::StudentId.is_in(student_ids))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(SubjectProgress::from).collect())
    }

    async fn streak(&self, student_id: Uuid) -> AppResult<Option<Streak>> {
        load_streak(&self.db, student_id).await
    }

    async fn achievements(&self, student_id: Uuid) -> AppResult<Vec<UnlockedAchievement>> {
        load_achievements(&self.db, student_id).await
    }
}
