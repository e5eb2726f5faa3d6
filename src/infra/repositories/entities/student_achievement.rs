use sea_orm::entity::prelude::*;

use crate::domain::UnlockedAchievement;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "student_achievements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub unlocked_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UnlockedAchievement {
    fn from(model: Model) -> Self {
        UnlockedAchievement {
            student_id: model.student_id,
            code: model.code,
            unlocked_at: model.unlocked_at,
        }
    }
}
