//! Learning progress: per-node attempts and per-subject mastery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::skill_tree::NodeStatus;
use crate::config::{PASS_THRESHOLD, PRACTICE_SATURATION_ATTEMPTS};
use crate::errors::{AppError, AppResult};

/// Mastery label derived from [`mastery_score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MasteryLevel {
    Beginner,
    Intermediate,
    Advanced,
    Master,
}

impl MasteryLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 40.0 {
            MasteryLevel::Beginner
        } else if score < 65.0 {
            MasteryLevel::Intermediate
        } else if score < 85.0 {
            MasteryLevel::Advanced
        } else {
            MasteryLevel::Master
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "BEGINNER",
            MasteryLevel::Intermediate => "INTERMEDIATE",
            MasteryLevel::Advanced => "ADVANCED",
            MasteryLevel::Master => "MASTER",
        }
    }
}

impl From<&str> for MasteryLevel {
    fn from(s: &str) -> Self {
        match s {
            "MASTER" => MasteryLevel::Master,
            "ADVANCED" => MasteryLevel::Advanced,
            "INTERMEDIATE" => MasteryLevel::Intermediate,
            _ => MasteryLevel::Beginner,
        }
    }
}

/// Weighted 0..=100 score: half accuracy, 35% completion, 15% practice volume.
pub fn mastery_score(
    correct_answers: i64,
    total_attempts: i64,
    completed_nodes: i64,
    total_nodes: i64,
) -> f64 {
    let accuracy = ratio(correct_answers, total_attempts);
    let completion = ratio(completed_nodes, total_nodes).min(1.0);
    let practice = (total_attempts.max(0) as f64 / PRACTICE_SATURATION_ATTEMPTS).min(1.0);
    100.0 * (0.5 * accuracy + 0.35 * completion + 0.15 * practice)
}

/// `part / whole`, or 0 for an empty whole.
pub fn ratio(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// One graded practice session on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub correct: i32,
    pub total: i32,
    pub time_spent_minutes: i32,
}

impl Attempt {
    pub fn new(correct: i32, total: i32, time_spent_minutes: i32) -> AppResult<Self> {
        if total < 1 {
            return Err(AppError::validation("An attempt needs at least one question"));
        }
        if correct < 0 || correct > total {
            return Err(AppError::validation(
                "Correct answers must be between 0 and the number of questions",
            ));
        }
        if time_spent_minutes < 0 {
            return Err(AppError::validation("Time spent cannot be negative"));
        }
        Ok(Self {
            correct,
            total,
            time_spent_minutes,
        })
    }

    pub fn score(&self) -> f64 {
        ratio(self.correct as i64, self.total as i64)
    }

    pub fn passed(&self) -> bool {
        self.score() >= PASS_THRESHOLD
    }

    pub fn is_perfect(&self) -> bool {
        self.correct == self.total
    }
}

/// A student's record on a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeProgress {
    pub student_id: Uuid,
    pub node_id: Uuid,
    pub subject_id: Uuid,
    pub status: NodeStatus,
    pub attempts: i32,
    pub passes: i32,
    pub best_score: f64,
    pub last_attempt_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NodeProgress {
    pub fn start(student_id: Uuid, node_id: Uuid, subject_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            student_id,
            node_id,
            subject_id,
            status: NodeStatus::Available,
            attempts: 0,
            passes: 0,
            best_score: 0.0,
            last_attempt_at: now,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == NodeStatus::Completed
    }

    /// Apply an attempt. Returns `true` when it completes the node for the
    /// first time.
    pub fn record(&mut self, attempt: &Attempt, now: DateTime<Utc>) -> bool {
        self.attempts += 1;
        self.best_score = self.best_score.max(attempt.score());
        self.last_attempt_at = now;

        if !attempt.passed() {
            if !self.is_completed() {
                self.status = NodeStatus::InProgress;
            }
            return false;
        }

        self.passes += 1;
        if self.is_completed() {
            return false;
        }
        self.status = NodeStatus::Completed;
        self.completed_at = Some(now);
        true
    }
}

/// Counters a student accumulates in one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectProgress {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub completed_nodes: i32,
    /// Questions answered
    pub total_attempts: i64,
    pub correct_answers: i64,
    pub time_spent_minutes: i64,
    pub mastery_score: f64,
    pub mastery_level: MasteryLevel,
    pub last_activity_at: DateTime<Utc>,
}

impl SubjectProgress {
    pub fn start(student_id: Uuid, subject_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            student_id,
            subject_id,
            completed_nodes: 0,
            total_attempts: 0,
            correct_answers: 0,
            time_spent_minutes: 0,
            mastery_score: 0.0,
            mastery_level: MasteryLevel::Beginner,
            last_activity_at: now,
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct_answers, self.total_attempts)
    }

    /// Add an attempt's counters and recompute mastery against the subject's
    /// current node count.
    pub fn record(
        &mut self,
        attempt: &Attempt,
        completed_nodes: i32,
        total_nodes: usize,
        now: DateTime<Utc>,
    ) {
        self.total_attempts += attempt.total as i64;
        self.correct_answers += attempt.correct as i64;
        self.time_spent_minutes += attempt.time_spent_minutes as i64;
        self.completed_nodes = completed_nodes;
        self.last_activity_at = now;
        self.mastery_score = mastery_score(
            self.correct_answers,
            self.total_attempts,
            completed_nodes as i64,
            total_nodes as i64,
        );
        self.mastery_level = MasteryLevel::from_score(self.mastery_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastery_boundaries() {
        assert_eq!(MasteryLevel::from_score(0.0), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::from_score(39.99), MasteryLevel::Beginner);
        assert_eq!(MasteryLevel::from_score(40.0), MasteryLevel::Intermediate);
        assert_eq!(MasteryLevel::from_score(65.0), MasteryLevel::Advanced);
        assert_eq!(MasteryLevel::from_score(85.0), MasteryLevel::Master);
        assert_eq!(MasteryLevel::from(MasteryLevel::Advanced.as_str()), MasteryLevel::Advanced);
    }

    #[test]
    fn mastery_score_weights() {
        assert_eq!(mastery_score(0, 0, 0, 0), 0.0);
        // perfect accuracy, everything complete, saturated practice
        assert!((mastery_score(50, 50, 4, 4) - 100.0).abs() < 1e-9);
        // accuracy 0.8, completion 0.5, practice 0.5
        let score = mastery_score(20, 25, 2, 4);
        assert!((score - (40.0 + 17.5 + 7.5)).abs() < 1e-9);
    }

    #[test]
    fn attempt_validation() {
        assert!(Attempt::new(0, 0, 1).is_err());
        assert!(Attempt::new(6, 5, 1).is_err());
        assert!(Attempt::new(-1, 5, 1).is_err());
        assert!(Attempt::new(3, 5, -2).is_err());
        let attempt = Attempt::new(7, 10, 12).unwrap();
        assert!(attempt.passed());
        assert!(!Attempt::new(6, 10, 12).unwrap().passed());
    }

    #[test]
    fn node_completes_once() {
        let now = Utc::now();
        let mut progress = NodeProgress::start(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), now);

        let fail = Attempt::new(2, 10, 5).unwrap();
        assert!(!progress.record(&fail, now));
        assert_eq!(progress.status, NodeStatus::InProgress);

        let pass = Attempt::new(9, 10, 5).unwrap();
        assert!(progress.record(&pass, now));
        assert_eq!(progress.status, NodeStatus::Completed);
        assert!(progress.completed_at.is_some());

        assert!(!progress.record(&pass, now));
        assert!(!progress.record(&fail, now));
        assert_eq!(progress.status, NodeStatus::Completed);
        assert_eq!(progress.attempts, 4);
        assert_eq!(progress.passes, 2);
        assert!((progress.best_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn subject_counters_accumulate() {
        let now = Utc::now();
        let mut progress = SubjectProgress::start(Uuid::new_v4(), Uuid::new_v4(), now);
        progress.record(&Attempt::new(8, 10, 15).unwrap(), 1, 4, now);
        progress.record(&Attempt::new(10, 10, 5).unwrap(), 2, 4, now);

        assert_eq!(progress.total_attempts, 20);
        assert_eq!(progress.correct_answers, 18);
        assert_eq!(progress.time_spent_minutes, 20);
        assert_eq!(progress.completed_nodes, 2);
        assert!((progress.accuracy() - 0.9).abs() < 1e-9);
        // 45 + 17.5 + 6
        assert!((progress.mastery_score - 68.5).abs() < 1e-9);
        assert_eq!(progress.mastery_level, MasteryLevel::Advanced);
    }
}
