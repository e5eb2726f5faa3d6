//! Reporting aggregates computed in memory from fetched rows.
//!
//! Every average over an empty set is zero.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::progress::{ratio, NodeProgress, SubjectProgress};
use super::school::Class;
use super::skill_tree::SkillNode;
use super::user::User;
use crate::config::{
    ACTIVE_STUDENT_WINDOW_DAYS, BOTTLENECK_LIMIT, STRUGGLING_ACCURACY, STRUGGLING_MIN_ANSWERS,
    TOP_STUDENTS_LIMIT,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassSummary {
    pub class_id: Uuid,
    pub name: String,
    pub student_count: usize,
    /// Mean mastery score over the students' subject records
    pub average_mastery: f64,
    /// Correct answers over answered questions, across the class
    pub average_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SchoolOverview {
    pub school_id: Uuid,
    pub teacher_count: u64,
    pub student_count: u64,
    pub class_count: usize,
    pub subject_count: usize,
    pub active_students: usize,
    pub average_mastery: f64,
    pub classes: Vec<ClassSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentSnapshot {
    pub student_id: Uuid,
    pub name: String,
    pub xp: i64,
    pub answered: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TeacherDashboard {
    pub teacher_id: Uuid,
    pub classes: Vec<ClassSummary>,
    pub struggling_students: Vec<StudentSnapshot>,
    pub top_students: Vec<StudentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NodeAnalytics {
    pub node_id: Uuid,
    pub title: String,
    /// Students with at least one attempt
    pub attempting: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub average_best_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PathAnalytics {
    pub subject_id: Uuid,
    pub nodes: Vec<NodeAnalytics>,
    pub bottlenecks: Vec<NodeAnalytics>,
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean mastery score over subject records.
pub fn average_mastery<'a>(progress: impl IntoIterator<Item = &'a SubjectProgress>) -> f64 {
    mean(progress.into_iter().map(|p| p.mastery_score))
}

/// Distinct students with activity inside the activity window ending at `now`.
pub fn active_students(progress: &[SubjectProgress], now: DateTime<Utc>) -> usize {
    let since = now - Duration::days(ACTIVE_STUDENT_WINDOW_DAYS);
    progress
        .iter()
        .filter(|p| p.last_activity_at >= since)
        .map(|p| p.student_id)
        .collect::<HashSet<_>>()
        .len()
}

/// Summary row for one class from its members' subject records.
pub fn summarize_class(
    class: &Class,
    student_ids: &[Uuid],
    progress: &[SubjectProgress],
) -> ClassSummary {
    let members: HashSet<Uuid> = student_ids.iter().copied().collect();
    let rows: Vec<&SubjectProgress> = progress
        .iter()
        .filter(|p| members.contains(&p.student_id))
        .collect();

    let correct: i64 = rows.iter().map(|p| p.correct_answers).sum();
    let answered: i64 = rows.iter().map(|p| p.total_attempts).sum();

    ClassSummary {
        class_id: class.id,
        name: class.name.clone(),
        student_count: members.len(),
        average_mastery: average_mastery(rows.iter().copied()),
        average_accuracy: ratio(correct, answered),
    }
}

/// Group class memberships by class.
pub fn members_by_class(enrollments: &[super::school::Enrollment]) -> HashMap<Uuid, Vec<Uuid>> {
    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for e in enrollments {
        grouped.entry(e.class_id).or_default().push(e.student_id);
    }
    grouped
}

/// Per-student totals across subjects.
pub fn student_snapshots(students: &[User], progress: &[SubjectProgress]) -> Vec<StudentSnapshot> {
    let mut totals: HashMap<Uuid, (i64, i64)> = HashMap::new();
    for p in progress {
        let entry = totals.entry(p.student_id).or_default();
        entry.0 += p.correct_answers;
        entry.1 += p.total_attempts;
    }

    students
        .iter()
        .map(|s| {
            let (correct, answered) = totals.get(&s.id).copied().unwrap_or_default();
            StudentSnapshot {
                student_id: s.id,
                name: s.name.clone(),
                xp: s.xp,
                answered,
                accuracy: ratio(correct, answered),
            }
        })
        .collect()
}

/// Students answering enough questions with low accuracy, weakest first.
pub fn struggling_students(snapshots: &[StudentSnapshot]) -> Vec<StudentSnapshot> {
    let mut struggling: Vec<StudentSnapshot> = snapshots
        .iter()
        .filter(|s| s.answered >= STRUGGLING_MIN_ANSWERS && s.accuracy < STRUGGLING_ACCURACY)
        .cloned()
        .collect();
    struggling.sort_by(|a, b| {
        a.accuracy
            .total_cmp(&b.accuracy)
            .then_with(|| a.name.cmp(&b.name))
    });
    struggling
}

/// Highest XP first, ties by name.
pub fn top_students(snapshots: &[StudentSnapshot]) -> Vec<StudentSnapshot> {
    let mut ranked = snapshots.to_vec();
    ranked.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_STUDENTS_LIMIT);
    ranked
}

/// Per-node completion over a subject's path, in the order `nodes` is given.
pub fn path_analytics(
    subject_id: Uuid,
    nodes: &[SkillNode],
    progress: &[NodeProgress],
) -> PathAnalytics {
    let mut by_node: HashMap<Uuid, Vec<&NodeProgress>> = HashMap::new();
    for p in progress.iter().filter(|p| p.attempts > 0) {
        by_node.entry(p.node_id).or_default().push(p);
    }

    let rows: Vec<NodeAnalytics> = nodes
        .iter()
        .map(|node| {
            let records = by_node.get(&node.id).map(Vec::as_slice).unwrap_or(&[]);
            let completed = records.iter().filter(|p| p.is_completed()).count();
            NodeAnalytics {
                node_id: node.id,
                title: node.title.clone(),
                attempting: records.len(),
                completed,
                completion_rate: ratio(completed as i64, records.len() as i64),
                average_best_score: mean(records.iter().map(|p| p.best_score)),
            }
        })
        .collect();

    let mut bottlenecks: Vec<NodeAnalytics> =
        rows.iter().filter(|r| r.attempting > 0).cloned().collect();
    bottlenecks.sort_by(|a, b| {
        a.completion_rate
            .total_cmp(&b.completion_rate)
            .then_with(|| b.attempting.cmp(&a.attempting))
    });
    bottlenecks.truncate(BOTTLENECK_LIMIT);

    PathAnalytics {
        subject_id,
        nodes: rows,
        bottlenecks,
    }
}
