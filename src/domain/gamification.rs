//! XP levels, daily streaks and achievements.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// XP per squared level step: level `n` starts at `50 * (n - 1)^2` XP.
const XP_LEVEL_FACTOR: f64 = 50.0;

/// Level reached with `xp` experience points (1-based).
pub fn level_for_xp(xp: i64) -> u32 {
    let xp = xp.max(0) as f64;
    (xp / XP_LEVEL_FACTOR).sqrt().floor() as u32 + 1
}

/// XP at which the level after `level` begins.
pub fn next_level_xp(level: u32) -> i64 {
    (XP_LEVEL_FACTOR as i64) * (level as i64) * (level as i64)
}

/// Consecutive-day activity counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Streak {
    pub student_id: Uuid,
    pub current: i32,
    pub longest: i32,
    pub last_active_date: Option<NaiveDate>,
}

impl Streak {
    pub fn new(student_id: Uuid) -> Self {
        Self {
            student_id,
            current: 0,
            longest: 0,
            last_active_date: None,
        }
    }

    /// Register activity on `today`. Returns `true` if the streak changed.
    pub fn record_activity(&mut self, today: NaiveDate) -> bool {
        match self.last_active_date {
            Some(last) if last == today => return false,
            Some(last) if last.succ_opt() == Some(today) => self.current += 1,
            _ => self.current = 1,
        }
        self.last_active_date = Some(today);
        self.longest = self.longest.max(self.current);
        true
    }

    /// The streak as it stands on `today`: broken streaks read as zero.
    pub fn as_of(&self, today: NaiveDate) -> Streak {
        let alive = self
            .last_active_date
            .map(|last| last == today || last.succ_opt() == Some(today))
            .unwrap_or(false);
        Streak {
            current: if alive { self.current } else { 0 },
            ..self.clone()
        }
    }
}

/// Facts an achievement rule is evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AchievementContext {
    pub nodes_completed: i64,
    pub current_streak: i32,
    pub total_xp: i64,
    pub perfect_attempt: bool,
    pub mastered_subjects: usize,
}

/// A row of the achievement rule table.
pub struct AchievementDefinition {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub bonus_xp: i64,
    rule: fn(&AchievementContext) -> bool,
}

impl AchievementDefinition {
    pub fn is_met(&self, ctx: &AchievementContext) -> bool {
        (self.rule)(ctx)
    }
}

impl std::fmt::Debug for AchievementDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AchievementDefinition")
            .field("code", &self.code)
            .field("bonus_xp", &self.bonus_xp)
            .finish()
    }
}

pub static ACHIEVEMENTS: &[AchievementDefinition] = &[
    AchievementDefinition {
        code: "FIRST_STEPS",
        title: "First Steps",
        description: "Complete your first skill node",
        bonus_xp: 10,
        rule: |c| c.nodes_completed >= 1,
    },
    AchievementDefinition {
        code: "QUICK_LEARNER",
        title: "Quick Learner",
        description: "Complete 10 skill nodes",
        bonus_xp: 50,
        rule: |c| c.nodes_completed >= 10,
    },
    AchievementDefinition {
        code: "KNOWLEDGE_SEEKER",
        title: "Knowledge Seeker",
        description: "Complete 50 skill nodes",
        bonus_xp: 200,
        rule: |c| c.nodes_completed >= 50,
    },
    AchievementDefinition {
        code: "ON_FIRE",
        title: "On Fire",
        description: "Practice 3 days in a row",
        bonus_xp: 20,
        rule: |c| c.current_streak >= 3,
    },
    AchievementDefinition {
        code: "WEEK_WARRIOR",
        title: "Week Warrior",
        description: "Practice 7 days in a row",
        bonus_xp: 70,
        rule: |c| c.current_streak >= 7,
    },
    AchievementDefinition {
        code: "UNSTOPPABLE",
        title: "Unstoppable",
        description: "Practice 30 days in a row",
        bonus_xp: 300,
        rule: |c| c.current_streak >= 30,
    },
    AchievementDefinition {
        code: "XP_HUNTER",
        title: "XP Hunter",
        description: "Earn 1000 XP",
        bonus_xp: 0,
        rule: |c| c.total_xp >= 1000,
    },
    AchievementDefinition {
        code: "PERFECTIONIST",
        title: "Perfectionist",
        description: "Answer every question of an attempt correctly",
        bonus_xp: 25,
        rule: |c| c.perfect_attempt,
    },
    AchievementDefinition {
        code: "SUBJECT_MASTER",
        title: "Subject Master",
        description: "Reach MASTER level in a subject",
        bonus_xp: 100,
        rule: |c| c.mastered_subjects >= 1,
    },
];

pub fn find_achievement(code: &str) -> Option<&'static AchievementDefinition> {
    ACHIEVEMENTS.iter().find(|a| a.code == code)
}

/// Achievements whose rule holds and which are not yet unlocked.
pub fn evaluate_achievements(
    ctx: &AchievementContext,
    unlocked: &HashSet<String>,
) -> Vec<&'static AchievementDefinition> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.contains(a.code))
        .filter(|a| a.is_met(ctx))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnlockedAchievement {
    pub student_id: Uuid,
    #[schema(example = "FIRST_STEPS")]
    pub code: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Achievement as shown on a profile, locked or not.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AchievementView {
    pub code: String,
    pub title: String,
    pub description: String,
    pub bonus_xp: i64,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl AchievementView {
    pub fn of(definition: &AchievementDefinition, unlocked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            code: definition.code.to_string(),
            title: definition.title.to_string(),
            description: definition.description.to_string(),
            bonus_xp: definition.bonus_xp,
            unlocked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn levels_grow_quadratically() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(49), 1);
        assert_eq!(level_for_xp(50), 2);
        assert_eq!(level_for_xp(199), 2);
        assert_eq!(level_for_xp(200), 3);
        assert_eq!(level_for_xp(-10), 1);
        assert_eq!(next_level_xp(1), 50);
        assert_eq!(next_level_xp(2), 200);
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let mut streak = Streak::new(Uuid::new_v4());
        assert!(streak.record_activity(day(1)));
        assert!(!streak.record_activity(day(1)));
        assert!(streak.record_activity(day(2)));
        assert!(streak.record_activity(day(3)));
        assert_eq!(streak.current, 3);

        assert!(streak.record_activity(day(6)));
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn broken_streak_reads_as_zero() {
        let mut streak = Streak::new(Uuid::new_v4());
        streak.record_activity(day(1));
        streak.record_activity(day(2));

        assert_eq!(streak.as_of(day(2)).current, 2);
        assert_eq!(streak.as_of(day(3)).current, 2);
        let broken = streak.as_of(day(4));
        assert_eq!(broken.current, 0);
        assert_eq!(broken.longest, 2);
    }

    #[test]
    fn achievements_unlock_once() {
        let ctx = AchievementContext {
            nodes_completed: 1,
            current_streak: 3,
            perfect_attempt: true,
            ..Default::default()
        };
        let codes: Vec<_> = evaluate_achievements(&ctx, &HashSet::new())
            .iter()
            .map(|a| a.code)
            .collect();
        assert_eq!(codes, vec!["FIRST_STEPS", "ON_FIRE", "PERFECTIONIST"]);

        let unlocked: HashSet<String> = codes.iter().map(|c| c.to_string()).collect();
        assert!(evaluate_achievements(&ctx, &unlocked).is_empty());
    }

    #[test]
    fn rule_table_codes_are_unique() {
        let codes: HashSet<_> = ACHIEVEMENTS.iter().map(|a| a.code).collect();
        assert_eq!(codes.len(), ACHIEVEMENTS.len());
        assert!(find_achievement("SUBJECT_MASTER").is_some());
        assert!(find_achievement("NOPE").is_none());
    }
}
