//! Skill node entity. Prerequisites live in [`super::skill_edge`].

use sea_orm::entity::prelude::*;

use crate::domain::SkillNode;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "skill_nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    pub xp_reward: i32,
    pub position: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_domain(self, prerequisites: Vec<Uuid>) -> SkillNode {
        SkillNode {
            id: self.id,
            subject_id: self.subject_id,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            xp_reward: self.xp_reward,
            position: self.position,
            prerequisites,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
