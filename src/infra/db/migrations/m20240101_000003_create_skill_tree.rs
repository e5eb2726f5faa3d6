//! Migration: skill nodes and prerequisite edges.

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_classes_and_subjects::Subjects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SkillNodes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SkillNodes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SkillNodes::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(SkillNodes::Title).string().not_null())
                    .col(ColumnDef::new(SkillNodes::Description).text().null())
                    .col(ColumnDef::new(SkillNodes::Difficulty).integer().not_null().default(1))
                    .col(ColumnDef::new(SkillNodes::XpReward).integer().not_null().default(10))
                    .col(ColumnDef::new(SkillNodes::Position).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(SkillNodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SkillNodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_skill_nodes_subject")
                            .from(SkillNodes::Table, SkillNodes::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_skill_nodes_subject")
                    .table(SkillNodes::Table)
                    .col(SkillNodes::SubjectId)
                    .to_owned(),
            )
            .await?;

        // Deleting a node removes its edges in both directions
        manager
            .create_table(
                Table::create()
                    .table(SkillEdges::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SkillEdges::NodeId).uuid().not_null())
                    .col(ColumnDef::new(SkillEdges::PrerequisiteId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(SkillEdges::NodeId)
                            .col(SkillEdges::PrerequisiteId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_skill_edges_node")
                            .from(SkillEdges::Table, SkillEdges::NodeId)
                            .to(SkillNodes::Table, SkillNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_skill_edges_prerequisite")
                            .from(SkillEdges::Table, SkillEdges::PrerequisiteId)
                            .to(SkillNodes::Table, SkillNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SkillEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkillNodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum SkillNodes {
    Table,
    Id,
    SubjectId,
    Title,
    Description,
    Difficulty,
    XpReward,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SkillEdges {
    Table,
    NodeId,
    PrerequisiteId,
}
