use sea_orm::entity::prelude::*;

use crate::domain::Class;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub grade_level: i32,
    pub teacher_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Class {
    fn from(model: Model) -> Self {
        Class {
            id: model.id,
            school_id: model.school_id,
            name: model.name,
            grade_level: model.grade_level,
            teacher_id: model.teacher_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
