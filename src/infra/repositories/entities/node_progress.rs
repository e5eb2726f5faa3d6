use sea_orm::entity::prelude::*;

use crate::domain::{NodeProgress, NodeStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "node_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub node_id: Uuid,
    pub subject_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub passes: i32,
    pub best_score: f64,
    pub last_attempt_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NodeProgress {
    fn from(model: Model) -> Self {
        NodeProgress {
            student_id: model.student_id,
            node_id: model.node_id,
            subject_id: model.subject_id,
            status: NodeStatus::from(model.status.as_str()),
            attempts: model.attempts,
            passes: model.passes,
            best_score: model.best_score,
            last_attempt_at: model.last_attempt_at,
            completed_at: model.completed_at,
        }
    }
}
