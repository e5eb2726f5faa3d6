use sea_orm::entity::prelude::*;

use crate::domain::Streak;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "streaks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: Uuid,
    pub current: i32,
    pub longest: i32,
    pub last_active_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Streak {
    fn from(model: Model) -> Self {
        Streak {
            student_id: model.student_id,
            current: model.current,
            longest: model.longest,
            last_active_date: model.last_active_date,
        }
    }
}
