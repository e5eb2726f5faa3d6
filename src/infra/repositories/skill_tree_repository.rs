//! Skill nodes and their prerequisite edges.
//!
//! Nodes are always returned with their prerequisite ids attached. Node
//! writes change the prerequisite graph, so they only run inside a Unit of
//! Work transaction holding the subject lock.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::entities::{node_progress, subject};
use super::entities::skill_edge::{self, Entity as SkillEdgeEntity};
use super::entities::skill_node::{self, ActiveModel, Entity as SkillNodeEntity};
use crate::domain::{NewSkillNode, NodeAttemptStats, SkillNode, SkillNodeChanges};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SkillTreeRepository: Send + Sync {
    async fn find_node(&self, id: Uuid) -> AppResult<Option<SkillNode>>;

    /// Every node of a subject, ordered by position
    async fn list_nodes(&self, subject_id: Uuid) -> AppResult<Vec<SkillNode>>;

    /// Deletes the node; edges in both directions go with it
    async fn delete_node(&self, id: Uuid) -> AppResult<()>;

    /// Attempts and passes per node, summed over all students
    async fn attempt_stats(&self, subject_id: Uuid) -> AppResult<HashMap<Uuid, NodeAttemptStats>>;

    /// Set `(node_id, difficulty)` pairs in one transaction
    async fn set_difficulties(&self, changes: Vec<(Uuid, i32)>) -> AppResult<()>;
}

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    node_id: Uuid,
    attempts: Option<i64>,
    passes: Option<i64>,
}

async fn prerequisites_of<C: ConnectionTrait>(
    db: &C,
    node_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    if node_ids.is_empty() {
        return Ok(grouped);
    }

    let edges = SkillEdgeEntity::find()
        .filter(skill_edge::Column::NodeId.is_in(node_ids))
        .all(db)
        .await?;
    for edge in edges {
        grouped.entry(edge.node_id).or_default().push(edge.prerequisite_id);
    }
    Ok(grouped)
}

async fn replace_edges<C: ConnectionTrait>(db: &C, node_id: Uuid, prerequisites: &[Uuid]) -> AppResult<()> {
    SkillEdgeEntity::delete_many()
        .filter(skill_edge::Column::NodeId.eq(node_id))
        .exec(db)
        .await?;

    if prerequisites.is_empty() {
        return Ok(());
    }

    let rows = prerequisites.iter().map(|p| skill_edge::ActiveModel {
        node_id: Set(node_id),
        prerequisite_id: Set(*p),
    });
    SkillEdgeEntity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn with_prerequisites<C: ConnectionTrait>(db: &C, model: skill_node::Model) -> AppResult<SkillNode> {
    let mut edges = prerequisites_of(db, vec![model.id]).await?;
    let prerequisites = edges.remove(&model.id).unwrap_or_default();
    Ok(model.into_domain(prerequisites))
}

/// Lock the subject row so prerequisite edits within it run one at a time.
pub(crate) async fn lock_subject<C: ConnectionTrait>(db: &C, subject_id: Uuid) -> AppResult<()> {
    subject::Entity::find_by_id(subject_id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(())
}

pub(crate) async fn load_nodes<C: ConnectionTrait>(db: &C, subject_id: Uuid) -> AppResult<Vec<SkillNode>> {
    let models = SkillNodeEntity::find()
        .filter(skill_node::Column::SubjectId.eq(subject_id))
        .order_by_asc(skill_node::Column::Position)
        .order_by_asc(skill_node::Column::Title)
        .all(db)
        .await?;

    let mut edges = prerequisites_of(db, models.iter().map(|m| m.id).collect()).await?;
    Ok(models
        .into_iter()
        .map(|m| {
            let prerequisites = edges.remove(&m.id).unwrap_or_default();
            m.into_domain(prerequisites)
        })
        .collect())
}

pub(crate) async fn insert_node<C: ConnectionTrait>(db: &C, node: NewSkillNode) -> AppResult<SkillNode> {
    let now = chrono::Utc::now();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        subject_id: Set(node.subject_id),
        title: Set(node.title),
        description: Set(node.description),
        difficulty: Set(node.difficulty),
        xp_reward: Set(node.xp_reward),
        position: Set(node.position),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    replace_edges(db, model.id, &node.prerequisites).await?;

    Ok(model.into_domain(node.prerequisites))
}

pub(crate) async fn apply_node_changes<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    changes: SkillNodeChanges,
) -> AppResult<SkillNode> {
    let existing = SkillNodeEntity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = changes.title {
        active.title = Set(title);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(difficulty) = changes.difficulty {
        active.difficulty = Set(difficulty);
    }
    if let Some(xp_reward) = changes.xp_reward {
        active.xp_reward = Set(xp_reward);
    }
    if let Some(position) = changes.position {
        active.position = Set(position);
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(db).await?;

    if let Some(prerequisites) = &changes.prerequisites {
        replace_edges(db, id, prerequisites).await?;
    }
    with_prerequisites(db, model).await
}

pub struct SkillTreeStore {
    db: DatabaseConnection,
}

impl SkillTreeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SkillTreeRepository for SkillTreeStore {
    async fn find_node(&self, id: Uuid) -> AppResult<Option<SkillNode>> {
        match SkillNodeEntity::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(with_prerequisites(&self.db, model).await?)),
            None => Ok(None),
        }
    }

    async fn list_nodes(&self, subject_id: Uuid) -> AppResult<Vec<SkillNode>> {
        load_nodes(&self.db, subject_id).await
    }

    async fn delete_node(&self, id: Uuid) -> AppResult<()> {
        let result = SkillNodeEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn attempt_stats(&self, subject_id: Uuid) -> AppResult<HashMap<Uuid, NodeAttemptStats>> {
        let rows = node_progress::Entity::find()
            .select_only()
            .column(node_progress::Column::NodeId)
            .column_as(node_progress::Column::Attempts.sum(), "attempts")
            .column_as(node_progress::Column::Passes.sum(), "passes")
            .filter(node_progress::Column::SubjectId.eq(subject_id))
            .group_by(node_progress::Column::NodeId)
            .into_model::<StatsRow>()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let stats = NodeAttemptStats {
                    attempts: r.attempts.unwrap_or(0),
                    passes: r.passes.unwrap_or(0),
                };
                (r.node_id, stats)
            })
            .collect())
    }

    async fn set_difficulties(&self, changes: Vec<(Uuid, i32)>) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await?;
        let now = chrono::Utc::now();
        for (id, difficulty) in changes {
            skill_node::ActiveModel {
                id: Set(id),
                difficulty: Set(difficulty),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
