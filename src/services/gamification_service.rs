//! XP levels, streaks, achievements and class leaderboards.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::access::school_class;
use crate::config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};
use crate::domain::gamification::{level_for_xp, next_level_xp, ACHIEVEMENTS};
use crate::domain::{AchievementView, Actor, Streak, User, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GamificationProfile {
    pub user_id: Uuid,
    pub xp: i64,
    pub level: u32,
    pub next_level_xp: i64,
    pub streak: Streak,
    /// Every achievement; locked ones have no `unlocked_at`
    pub achievements: Vec<AchievementView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub student_id: Uuid,
    pub name: String,
    pub xp: i64,
    pub level: u32,
}

#[async_trait]
pub trait GamificationService: Send + Sync {
    async fn profile(&self, actor: Actor) -> AppResult<GamificationProfile>;

    /// Students of a class by XP, highest first
    async fn leaderboard(&self, actor: Actor, class_id: Uuid, limit: Option<u64>) -> AppResult<Vec<LeaderboardEntry>>;
}

pub struct GamificationManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> GamificationManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

/// Rank students by XP, then name.
pub fn rank_students(mut students: Vec<User>, limit: usize) -> Vec<LeaderboardEntry> {
    students.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.name.cmp(&b.name)));
    students
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, s)| LeaderboardEntry {
            rank: i + 1,
            student_id: s.id,
            level: level_for_xp(s.xp),
            xp: s.xp,
            name: s.name,
        })
        .collect()
}

#[async_trait]
impl<U: UnitOfWork> GamificationService for GamificationManager<U> {
    async fn profile(&self, actor: Actor) -> AppResult<GamificationProfile> {
        let user = self.uow.users().find_by_id(actor.id).await?.ok_or_not_found()?;
        let progress = self.uow.progress();
        let today = Utc::now().date_naive();

        let streak = progress
            .streak(actor.id)
            .await?
            .map(|s| s.as_of(today))
            .unwrap_or_else(|| Streak::new(actor.id));

        let unlocked: HashMap<String, _> = progress
            .achievements(actor.id)
            .await?
            .into_iter()
            .map(|a| (a.code, a.unlocked_at))
            .collect();
        let achievements = ACHIEVEMENTS
            .iter()
            .map(|def| AchievementView::of(def, unlocked.get(def.code).copied()))
            .collect();

        let level = level_for_xp(user.xp);
        Ok(GamificationProfile {
            user_id: user.id,
            xp: user.xp,
            level,
            next_level_xp: next_level_xp(level),
            streak,
            achievements,
        })
    }

    async fn leaderboard(&self, actor: Actor, class_id: Uuid, limit: Option<u64>) -> AppResult<Vec<LeaderboardEntry>> {
        let class = school_class(self.uow.as_ref(), &actor, class_id).await?;
        let student_ids = self.uow.classes().student_ids(class_id).await?;

        let allowed = match actor.role {
            UserRole::SchoolOwner => true,
            UserRole::Teacher => class.teacher_id == Some(actor.id),
            UserRole::Student => student_ids.contains(&actor.id),
        };
        if !allowed {
            return Err(AppError::Forbidden);
        }

        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT) as usize;
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }
        let students = self.uow.users().find_many(student_ids).await?;
        Ok(rank_students(students, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(name: &str, xp: i64) -> User {
        User {
            id: Uuid::new_v4(),
            school_id: Uuid::nil(),
            email: format!("{}@school.edu", name.to_lowercase()),
            password_hash: String::new(),
            name: name.to_string(),
            role: UserRole::Student,
            xp,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn leaderboard_orders_by_xp_then_name() {
        let ranked = rank_students(
            vec![student("Cleo", 120), student("Bea", 300), student("Abe", 120)],
            10,
        );
        let names: Vec<&str> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Bea", "Abe", "Cleo"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].level, 3);
    }

    #[test]
    fn leaderboard_respects_limit() {
        let ranked = rank_students(vec![student("A", 1), student("B", 2), student("C", 3)], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].name, "B");
    }
}
