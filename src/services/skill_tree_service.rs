//! Skill nodes of a subject, their prerequisite graph and difficulty
//! calibration.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::access::{school_subject, viewable_student};
use crate::domain::skill_tree::{calibrate, validate_difficulty};
use crate::domain::{
    Actor, DifficultyAdjustment, NewSkillNode, SkillGraph, SkillNode, SkillNodeChanges,
    StudentTreeNode, TreeNode,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::with_transaction;

#[derive(Debug, Clone)]
pub struct NodeInput {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    pub xp_reward: i32,
    pub position: i32,
    pub prerequisites: Vec<Uuid>,
}

/// Result of recalibrating one subject.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalibrationReport {
    pub subject_id: Uuid,
    /// When set, nothing was written
    pub dry_run: bool,
    pub adjustments: Vec<DifficultyAdjustment>,
}

#[async_trait]
pub trait SkillTreeService: Send + Sync {
    async fn create_node(&self, actor: Actor, subject_id: Uuid, input: NodeInput) -> AppResult<SkillNode>;

    async fn get_node(&self, actor: Actor, id: Uuid) -> AppResult<SkillNode>;

    /// Update fields and optionally replace the prerequisite set
    async fn update_node(&self, actor: Actor, id: Uuid, changes: SkillNodeChanges) -> AppResult<SkillNode>;

    async fn delete_node(&self, actor: Actor, id: Uuid) -> AppResult<()>;

    /// Nodes in topological order with their depth
    async fn get_tree(&self, actor: Actor, subject_id: Uuid) -> AppResult<Vec<TreeNode>>;

    /// The tree annotated with one student's status per node
    async fn get_student_tree(&self, actor: Actor, subject_id: Uuid, student_id: Uuid) -> AppResult<Vec<StudentTreeNode>>;

    async fn calibrate_subject(&self, actor: Actor, subject_id: Uuid, dry_run: bool) -> AppResult<CalibrationReport>;

    /// Calibration without an actor, for offline maintenance
    async fn recalibrate(&self, subject_id: Uuid, dry_run: bool) -> AppResult<CalibrationReport>;

    /// Every subject, in creation order
    async fn calibration_targets(&self) -> AppResult<Vec<Uuid>>;
}

pub struct SkillTreeManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> SkillTreeManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn graph(&self, subject_id: Uuid) -> AppResult<SkillGraph> {
        let nodes = self.uow.skill_tree().list_nodes(subject_id).await?;
        Ok(SkillGraph::new(nodes)?)
    }

    /// A node of a subject in the actor's school.
    async fn school_node(&self, actor: &Actor, id: Uuid) -> AppResult<SkillNode> {
        let node = self.uow.skill_tree().find_node(id).await?.ok_or_not_found()?;
        school_subject(self.uow.as_ref(), actor, node.subject_id).await?;
        Ok(node)
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn clean_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(title.to_string())
}

/// Blank descriptions are stored as none.
fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn validate_xp_reward(xp_reward: i32) -> AppResult<()> {
    if xp_reward < 0 {
        return Err(AppError::validation("XP reward cannot be negative"));
    }
    Ok(())
}

#[async_trait]
impl<U: UnitOfWork> SkillTreeService for SkillTreeManager<U> {
    async fn create_node(&self, actor: Actor, subject_id: Uuid, input: NodeInput) -> AppResult<SkillNode> {
        actor.require_staff()?;
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;
        validate_difficulty(input.difficulty)?;
        validate_xp_reward(input.xp_reward)?;

        let new_node = NewSkillNode {
            subject_id,
            title: clean_title(&input.title)?,
            description: clean_description(input.description),
            difficulty: input.difficulty,
            xp_reward: input.xp_reward,
            position: input.position,
            prerequisites: dedup(input.prerequisites),
        };

        let node = with_transaction!(self.uow, |ctx| {
            let tree = ctx.skill_tree();
            tree.lock_subject(subject_id).await?;
            // Unknown ids include nodes of other subjects
            SkillGraph::new(tree.list_nodes(subject_id).await?)?
                .check_prerequisites(Uuid::new_v4(), &new_node.prerequisites)?;
            tree.create_node(new_node).await
        })?;

        tracing::info!(node_id = %node.id, subject_id = %subject_id, "Skill node created");
        Ok(node)
    }

    async fn get_node(&self, actor: Actor, id: Uuid) -> AppResult<SkillNode> {
        self.school_node(&actor, id).await
    }

    async fn update_node(&self, actor: Actor, id: Uuid, mut changes: SkillNodeChanges) -> AppResult<SkillNode> {
        actor.require_staff()?;
        let node = self.school_node(&actor, id).await?;

        if let Some(difficulty) = changes.difficulty {
            validate_difficulty(difficulty)?;
        }
        if let Some(xp_reward) = changes.xp_reward {
            validate_xp_reward(xp_reward)?;
        }
        if let Some(title) = changes.title.take() {
            changes.title = Some(clean_title(&title)?);
        }
        if let Some(description) = changes.description.take() {
            changes.description = Some(clean_description(description));
        }
        if let Some(prerequisites) = changes.prerequisites.take() {
            changes.prerequisites = Some(dedup(prerequisites));
        }

        let subject_id = node.subject_id;
        with_transaction!(self.uow, |ctx| {
            let tree = ctx.skill_tree();
            // Edits of one subject's graph run one at a time so none can close a cycle
            tree.lock_subject(subject_id).await?;
            if let Some(prerequisites) = &changes.prerequisites {
                SkillGraph::new(tree.list_nodes(subject_id).await?)?
                    .check_prerequisites(id, prerequisites)?;
            }
            tree.update_node(id, changes).await
        })
    }

    async fn delete_node(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        actor.require_staff()?;
        self.school_node(&actor, id).await?;

        self.uow.skill_tree().delete_node(id).await?;
        tracing::info!(node_id = %id, "Skill node deleted");
        Ok(())
    }

    async fn get_tree(&self, actor: Actor, subject_id: Uuid) -> AppResult<Vec<TreeNode>> {
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;
        Ok(self.graph(subject_id).await?.tree())
    }

    async fn get_student_tree(&self, actor: Actor, subject_id: Uuid, student_id: Uuid) -> AppResult<Vec<StudentTreeNode>> {
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;
        viewable_student(self.uow.as_ref(), &actor, student_id).await?;

        let graph = self.graph(subject_id).await?;
        let progress = self.uow.progress().node_progress(student_id, subject_id).await?;

        let completed: HashSet<Uuid> = progress
            .iter()
            .filter(|p| p.is_completed())
            .map(|p| p.node_id)
            .collect();
        let attempted: HashSet<Uuid> = progress
            .iter()
            .filter(|p| p.attempts > 0)
            .map(|p| p.node_id)
            .collect();

        Ok(graph
            .tree()
            .into_iter()
            .map(|entry| {
                let record = progress.iter().find(|p| p.node_id == entry.node.id);
                StudentTreeNode {
                    status: graph.status(entry.node.id, &completed, &attempted),
                    attempts: record.map(|p| p.attempts).unwrap_or(0),
                    best_score: record.map(|p| p.best_score),
                    depth: entry.depth,
                    node: entry.node,
                }
            })
            .collect())
    }

    async fn calibrate_subject(&self, actor: Actor, subject_id: Uuid, dry_run: bool) -> AppResult<CalibrationReport> {
        actor.require_staff()?;
        school_subject(self.uow.as_ref(), &actor, subject_id).await?;
        self.recalibrate(subject_id, dry_run).await
    }

    async fn recalibrate(&self, subject_id: Uuid, dry_run: bool) -> AppResult<CalibrationReport> {
        let skill_tree = self.uow.skill_tree();
        let nodes = skill_tree.list_nodes(subject_id).await?;
        let stats = skill_tree.attempt_stats(subject_id).await?;
        let adjustments = calibrate(&nodes, &stats);

        if !dry_run && !adjustments.is_empty() {
            skill_tree
                .set_difficulties(adjustments.iter().map(|a| (a.node_id, a.suggested)).collect())
                .await?;
            tracing::info!(subject_id = %subject_id, changed = adjustments.len(), "Difficulties recalibrated");
        }

        Ok(CalibrationReport {
            subject_id,
            dry_run,
            adjustments,
        })
    }

    async fn calibration_targets(&self) -> AppResult<Vec<Uuid>> {
        self.uow.subjects().list_ids().await
    }
}
