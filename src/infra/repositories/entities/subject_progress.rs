use sea_orm::entity::prelude::*;

use crate::domain::{MasteryLevel, SubjectProgress};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subject_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject_id: Uuid,
    pub completed_nodes: i32,
    pub total_attempts: i64,
    pub correct_answers: i64,
    pub time_spent_minutes: i64,
    pub mastery_score: f64,
    pub mastery_level: String,
    pub last_activity_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SubjectProgress {
    fn from(model: Model) -> Self {
        SubjectProgress {
            student_id: model.student_id,
            subject_id: model.subject_id,
            completed_nodes: model.completed_nodes,
            total_attempts: model.total_attempts,
            correct_answers: model.correct_answers,
            time_spent_minutes: model.time_spent_minutes,
            mastery_score: model.mastery_score,
            mastery_level: MasteryLevel::from(model.mastery_level.as_str()),
            last_activity_at: model.last_activity_at,
        }
    }
}
