//! Migration: learning progress, streaks and unlocked achievements.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_schools_and_users::Users;
use super::m20240101_000002_create_classes_and_subjects::Subjects;
use super::m20240101_000003_create_skill_tree::SkillNodes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NodeProgress::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NodeProgress::StudentId).uuid().not_null())
                    .col(ColumnDef::new(NodeProgress::NodeId).uuid().not_null())
                    .col(ColumnDef::new(NodeProgress::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(NodeProgress::Status).string_len(16).not_null())
                    .col(ColumnDef::new(NodeProgress::Attempts).integer().not_null().default(0))
                    .col(ColumnDef::new(NodeProgress::Passes).integer().not_null().default(0))
                    .col(ColumnDef::new(NodeProgress::BestScore).double().not_null().default(0.0))
                    .col(
                        ColumnDef::new(NodeProgress::LastAttemptAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NodeProgress::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(NodeProgress::StudentId)
                            .col(NodeProgress::NodeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_node_progress_student")
                            .from(NodeProgress::Table, NodeProgress::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_node_progress_node")
                            .from(NodeProgress::Table, NodeProgress::NodeId)
                            .to(SkillNodes::Table, SkillNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_node_progress_subject")
                    .table(NodeProgress::Table)
                    .col(NodeProgress::SubjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubjectProgress::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SubjectProgress::StudentId).uuid().not_null())
                    .col(ColumnDef::new(SubjectProgress::SubjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(SubjectProgress::CompletedNodes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::TotalAttempts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::CorrectAnswers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::TimeSpentMinutes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::MasteryScore)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::MasteryLevel)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubjectProgress::LastActivityAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SubjectProgress::StudentId)
                            .col(SubjectProgress::SubjectId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_progress_student")
                            .from(SubjectProgress::Table, SubjectProgress::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_progress_subject")
                            .from(SubjectProgress::Table, SubjectProgress::SubjectId)
                            .to(Subjects::Table, Subjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Streaks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Streaks::StudentId).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Streaks::Current).integer().not_null().default(0))
                    .col(ColumnDef::new(Streaks::Longest).integer().not_null().default(0))
                    .col(ColumnDef::new(Streaks::LastActiveDate).date().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_streaks_student")
                            .from(Streaks::Table, Streaks::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StudentAchievements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StudentAchievements::StudentId).uuid().not_null())
                    .col(ColumnDef::new(StudentAchievements::Code).string_len(32).not_null())
                    .col(
                        ColumnDef::new(StudentAchievements::UnlockedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(StudentAchievements::StudentId)
                            .col(StudentAchievements::Code),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_student_achievements_student")
                            .from(StudentAchievements::Table, StudentAchievements::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StudentAchievements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Streaks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubjectProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NodeProgress::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NodeProgress {
    Table,
    StudentId,
    NodeId,
    SubjectId,
    Status,
    Attempts,
    Passes,
    BestScore,
    LastAttemptAt,
    CompletedAt,
}

#[derive(Iden)]
enum SubjectProgress {
    Table,
    StudentId,
    SubjectId,
    CompletedNodes,
    TotalAttempts,
    CorrectAnswers,
    TimeSpentMinutes,
    MasteryScore,
    MasteryLevel,
    LastActivityAt,
}

#[derive(Iden)]
enum Streaks {
    Table,
    StudentId,
    Current,
    Longest,
    LastActiveDate,
}

#[derive(Iden)]
enum StudentAchievements {
    Table,
    StudentId,
    Code,
    UnlockedAt,
}
