//! Skill tree: learning nodes linked by prerequisite edges.
//!
//! Edges point from a node to the nodes that must be completed before it.
//! The edge set of a subject is a DAG; [`SkillGraph`] enforces that and
//! answers ordering and unlock questions over it.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{CALIBRATION_MIN_ATTEMPTS, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkillNode {
    pub id: Uuid,
    pub subject_id: Uuid,
    #[schema(example = "Linear equations")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 2, minimum = 1, maximum = 5)]
    pub difficulty: i32,
    #[schema(example = 40)]
    pub xp_reward: i32,
    /// Display order among siblings
    pub position: i32,
    pub prerequisites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSkillNode {
    pub subject_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    pub xp_reward: i32,
    pub position: i32,
    pub prerequisites: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillNodeChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub difficulty: Option<i32>,
    pub xp_reward: Option<i32>,
    pub position: Option<i32>,
    /// `Some` replaces the whole prerequisite set
    pub prerequisites: Option<Vec<Uuid>>,
}

/// Where a student stands on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Locked,
    Available,
    InProgress,
    Completed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Locked => "locked",
            NodeStatus::Available => "available",
            NodeStatus::InProgress => "in_progress",
            NodeStatus::Completed => "completed",
        }
    }
}

impl From<&str> for NodeStatus {
    fn from(s: &str) -> Self {
        match s {
            "completed" => NodeStatus::Completed,
            "in_progress" => NodeStatus::InProgress,
            "available" => NodeStatus::Available,
            _ => NodeStatus::Locked,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkillGraphError {
    #[error("Skill node {0} not found in this subject")]
    UnknownNode(Uuid),

    #[error("Prerequisite {0} does not belong to this subject")]
    UnknownPrerequisite(Uuid),

    #[error("Skill node {0} cannot be its own prerequisite")]
    SelfPrerequisite(Uuid),

    #[error("Prerequisites would create a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Node annotated with its depth in the tree.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: SkillNode,
    /// Length of the longest prerequisite chain below this node
    pub depth: usize,
}

/// Node annotated with a student's standing on it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentTreeNode {
    #[serde(flatten)]
    pub node: SkillNode,
    pub depth: usize,
    pub status: NodeStatus,
    pub attempts: i32,
    pub best_score: Option<f64>,
}

/// Read-only prerequisite graph over the nodes of one subject.
#[derive(Debug, Clone)]
pub struct SkillGraph {
    nodes: HashMap<Uuid, SkillNode>,
}

impl SkillGraph {
    /// Build a graph, rejecting dangling edges, self loops and cycles.
    pub fn new(nodes: Vec<SkillNode>) -> Result<Self, SkillGraphError> {
        let graph = Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        };

        for node in graph.nodes.values() {
            for prereq in &node.prerequisites {
                if *prereq == node.id {
                    return Err(SkillGraphError::SelfPrerequisite(node.id));
                }
                if !graph.nodes.contains_key(prereq) {
                    return Err(SkillGraphError::UnknownPrerequisite(*prereq));
                }
            }
        }

        if graph.topological_order().len() != graph.nodes.len() {
            // Kahn's algorithm left nodes behind; find one cycle to report.
            let start = graph
                .nodes
                .values()
                .find_map(|n| graph.find_path(&n.prerequisites, n.id).map(|p| (n.id, p)));
            let names = match start {
                Some((id, path)) => graph.cycle_names(id, path),
                None => Vec::new(),
            };
            return Err(SkillGraphError::Cycle(names));
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&SkillNode> {
        self.nodes.get(&id)
    }

    /// Check that `node_id` may take `prerequisites` as its new edge set.
    ///
    /// `node_id` may be absent from the graph (a node being created).
    pub fn check_prerequisites(
        &self,
        node_id: Uuid,
        prerequisites: &[Uuid],
    ) -> Result<(), SkillGraphError> {
        for prereq in prerequisites {
            if *prereq == node_id {
                return Err(SkillGraphError::SelfPrerequisite(node_id));
            }
            if !self.nodes.contains_key(prereq) {
                return Err(SkillGraphError::UnknownPrerequisite(*prereq));
            }
        }

        if !self.nodes.contains_key(&node_id) {
            // Nothing can depend on a node that does not exist yet.
            return Ok(());
        }

        match self.find_path(prerequisites, node_id) {
            Some(path) => Err(SkillGraphError::Cycle(self.cycle_names(node_id, path))),
            None => Ok(()),
        }
    }

    /// Breadth-first search along prerequisite edges from `from` to `target`.
    /// Returns the visited chain starting at one of `from` and ending at `target`.
    fn find_path(&self, from: &[Uuid], target: Uuid) -> Option<Vec<Uuid>> {
        let mut parent: HashMap<Uuid, Option<Uuid>> = HashMap::new();
        let mut queue = VecDeque::new();

        for start in from {
            if parent.insert(*start, None).is_none() {
                queue.push_back(*start);
            }
        }

        while let Some(current) = queue.pop_front() {
            if current == target {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(Some(prev)) = parent.get(&cursor) {
                    path.push(*prev);
                    cursor = *prev;
                }
                path.reverse();
                return Some(path);
            }
            if let Some(node) = self.nodes.get(&current) {
                for next in &node.prerequisites {
                    if !parent.contains_key(next) {
                        parent.insert(*next, Some(current));
                        queue.push_back(*next);
                    }
                }
            }
        }

        None
    }

    fn cycle_names(&self, start: Uuid, path: Vec<Uuid>) -> Vec<String> {
        std::iter::once(start)
            .chain(path)
            .map(|id| {
                self.nodes
                    .get(&id)
                    .map(|n| n.title.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect()
    }

    /// Nodes ordered so that every node follows its prerequisites.
    ///
    /// Ties are broken by position, then title, then id, so the order is
    /// stable across calls. On a cyclic edge set the result is shorter than
    /// the node count.
    pub fn topological_order(&self) -> Vec<Uuid> {
        let mut remaining: HashMap<Uuid, usize> = self
            .nodes
            .values()
            .map(|n| (n.id, n.prerequisites.len()))
            .collect();

        let mut dependents: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for node in self.nodes.values() {
            for prereq in &node.prerequisites {
                dependents.entry(*prereq).or_default().push(node.id);
            }
        }

        let key = |id: Uuid| {
            let n = &self.nodes[&id];
            (n.position, n.title.clone(), n.id)
        };

        let mut ready: BTreeSet<(i32, String, Uuid)> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| key(*id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some((_, _, id)) = ready.pop_first() {
            order.push(id);
            for dependent in dependents.get(&id).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(key(*dependent));
                    }
                }
            }
        }

        order
    }

    /// Longest prerequisite chain length for every node.
    pub fn depths(&self) -> HashMap<Uuid, usize> {
        let mut depths = HashMap::with_capacity(self.nodes.len());
        for id in self.topological_order() {
            let depth = self.nodes[&id]
                .prerequisites
                .iter()
                .filter_map(|p| depths.get(p))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depths.insert(id, depth);
        }
        depths
    }

    /// Nodes in topological order with their depth.
    pub fn tree(&self) -> Vec<TreeNode> {
        let depths = self.depths();
        self.topological_order()
            .into_iter()
            .map(|id| TreeNode {
                node: self.nodes[&id].clone(),
                depth: depths.get(&id).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Prerequisites of `node_id` that are not in `completed`.
    pub fn missing_prerequisites(
        &self,
        node_id: Uuid,
        completed: &HashSet<Uuid>,
    ) -> Result<Vec<&SkillNode>, SkillGraphError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(SkillGraphError::UnknownNode(node_id))?;
        Ok(node
            .prerequisites
            .iter()
            .filter(|p| !completed.contains(*p))
            .filter_map(|p| self.nodes.get(p))
            .collect())
    }

    /// Status of a node for a student who completed `completed` and has
    /// attempted `attempted`.
    pub fn status(
        &self,
        node_id: Uuid,
        completed: &HashSet<Uuid>,
        attempted: &HashSet<Uuid>,
    ) -> NodeStatus {
        if completed.contains(&node_id) {
            return NodeStatus::Completed;
        }
        let unlocked = self
            .nodes
            .get(&node_id)
            .map(|n| n.prerequisites.iter().all(|p| completed.contains(p)))
            .unwrap_or(false);
        match (unlocked, attempted.contains(&node_id)) {
            (false, _) => NodeStatus::Locked,
            (true, true) => NodeStatus::InProgress,
            (true, false) => NodeStatus::Available,
        }
    }

    /// Nodes that become available once `just_completed` joins `completed`.
    pub fn newly_unlocked(&self, just_completed: Uuid, completed: &HashSet<Uuid>) -> Vec<Uuid> {
        let mut now_completed = completed.clone();
        now_completed.insert(just_completed);

        self.topological_order()
            .into_iter()
            .filter(|id| !now_completed.contains(id))
            .filter(|id| {
                let node = &self.nodes[id];
                node.prerequisites.contains(&just_completed)
                    && node.prerequisites.iter().all(|p| now_completed.contains(p))
            })
            .collect()
    }
}

pub fn validate_difficulty(difficulty: i32) -> AppResult<()> {
    if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Difficulty must be between {} and {}",
            MIN_DIFFICULTY, MAX_DIFFICULTY
        )))
    }
}

/// Aggregated attempt counts for one node across all students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeAttemptStats {
    pub attempts: i64,
    pub passes: i64,
}

/// Difficulty suggested by observed pass rates.
///
/// Returns `None` when the node has too few attempts to judge.
pub fn suggest_difficulty(stats: NodeAttemptStats) -> Option<i32> {
    if stats.attempts < CALIBRATION_MIN_ATTEMPTS {
        return None;
    }
    let pass_rate = stats.passes as f64 / stats.attempts as f64;
    let difficulty = if pass_rate >= 0.9 {
        1
    } else if pass_rate >= 0.75 {
        2
    } else if pass_rate >= 0.55 {
        3
    } else if pass_rate >= 0.35 {
        4
    } else {
        5
    };
    Some(difficulty)
}

/// One difficulty change proposed by calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DifficultyAdjustment {
    pub node_id: Uuid,
    pub title: String,
    pub attempts: i64,
    pub pass_rate: f64,
    pub previous: i32,
    pub suggested: i32,
}

/// Compare each node's difficulty with the one its statistics suggest.
pub fn calibrate(
    nodes: &[SkillNode],
    stats: &HashMap<Uuid, NodeAttemptStats>,
) -> Vec<DifficultyAdjustment> {
    nodes
        .iter()
        .filter_map(|node| {
            let node_stats = stats.get(&node.id).copied().unwrap_or_default();
            let suggested = suggest_difficulty(node_stats)?;
            (suggested != node.difficulty).then(|| DifficultyAdjustment {
                node_id: node.id,
                title: node.title.clone(),
                attempts: node_stats.attempts,
                pass_rate: node_stats.passes as f64 / node_stats.attempts as f64,
                previous: node.difficulty,
                suggested,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, position: i32, prerequisites: Vec<Uuid>) -> SkillNode {
        SkillNode {
            id: Uuid::new_v4(),
            subject_id: Uuid::nil(),
            title: title.to_string(),
            description: None,
            difficulty: 3,
            xp_reward: 10,
            position,
            prerequisites,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// counting -> (addition, subtraction) -> multiplication
    fn arithmetic() -> (SkillGraph, [Uuid; 4]) {
        let counting = node("Counting", 0, vec![]);
        let addition = node("Addition", 0, vec![counting.id]);
        let subtraction = node("Subtraction", 1, vec![counting.id]);
        let multiplication = node("Multiplication", 0, vec![addition.id, subtraction.id]);
        let ids = [counting.id, addition.id, subtraction.id, multiplication.id];
        let graph = SkillGraph::new(vec![multiplication, subtraction, addition, counting]).unwrap();
        (graph, ids)
    }

    #[test]
    fn orders_prerequisites_first_with_stable_ties() {
        let (graph, [counting, addition, subtraction, multiplication]) = arithmetic();
        assert_eq!(
            graph.topological_order(),
            vec![counting, addition, subtraction, multiplication]
        );
    }

    #[test]
    fn depth_is_longest_chain() {
        let (graph, [counting, addition, _, multiplication]) = arithmetic();
        let depths = graph.depths();
        assert_eq!(depths[&counting], 0);
        assert_eq!(depths[&addition], 1);
        assert_eq!(depths[&multiplication], 2);
    }

    #[test]
    fn rejects_unknown_and_self_prerequisites() {
        let stray = Uuid::new_v4();
        let a = node("A", 0, vec![stray]);
        assert_eq!(
            SkillGraph::new(vec![a]).unwrap_err(),
            SkillGraphError::UnknownPrerequisite(stray)
        );

        let mut b = node("B", 0, vec![]);
        b.prerequisites.push(b.id);
        let b_id = b.id;
        assert_eq!(
            SkillGraph::new(vec![b]).unwrap_err(),
            SkillGraphError::SelfPrerequisite(b_id)
        );
    }

    #[test]
    fn rejects_stored_cycles() {
        let mut a = node("A", 0, vec![]);
        let b = node("B", 0, vec![a.id]);
        a.prerequisites.push(b.id);
        let err = SkillGraph::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, SkillGraphError::Cycle(ref names) if names.len() == 3));
    }

    #[test]
    fn prerequisite_update_that_closes_a_loop_is_rejected() {
        let (graph, [counting, _, _, multiplication]) = arithmetic();
        let err = graph
            .check_prerequisites(counting, &[multiplication])
            .unwrap_err();
        match err {
            SkillGraphError::Cycle(names) => {
                assert_eq!(names.first().map(String::as_str), Some("Counting"));
                assert_eq!(names.last().map(String::as_str), Some("Counting"));
                assert!(names.contains(&"Multiplication".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn new_node_prerequisites_only_need_to_exist() {
        let (graph, [_, addition, subtraction, _]) = arithmetic();
        assert!(graph
            .check_prerequisites(Uuid::new_v4(), &[addition, subtraction])
            .is_ok());
        assert!(graph
            .check_prerequisites(Uuid::new_v4(), &[Uuid::new_v4()])
            .is_err());
    }

    #[test]
    fn statuses_follow_completion() {
        let (graph, [counting, addition, subtraction, multiplication]) = arithmetic();
        let completed: HashSet<Uuid> = [counting, addition].into_iter().collect();
        let attempted: HashSet<Uuid> = [counting, addition, subtraction].into_iter().collect();

        assert_eq!(graph.status(counting, &completed, &attempted), NodeStatus::Completed);
        assert_eq!(graph.status(subtraction, &completed, &attempted), NodeStatus::InProgress);
        assert_eq!(graph.status(multiplication, &completed, &attempted), NodeStatus::Locked);

        let fresh = HashSet::new();
        assert_eq!(graph.status(counting, &fresh, &fresh), NodeStatus::Available);
    }

    #[test]
    fn unlocks_only_when_every_prerequisite_is_done() {
        let (graph, [counting, addition, subtraction, multiplication]) = arithmetic();

        let unlocked = graph.newly_unlocked(counting, &HashSet::new());
        assert_eq!(unlocked, vec![addition, subtraction]);

        let done: HashSet<Uuid> = [counting].into_iter().collect();
        assert!(graph.newly_unlocked(addition, &done).is_empty());

        let done: HashSet<Uuid> = [counting, addition].into_iter().collect();
        assert_eq!(graph.newly_unlocked(subtraction, &done), vec![multiplication]);
    }

    #[test]
    fn missing_prerequisites_lists_unfinished_ones() {
        let (graph, [counting, addition, subtraction, multiplication]) = arithmetic();
        let done: HashSet<Uuid> = [counting, addition].into_iter().collect();
        let missing = graph.missing_prerequisites(multiplication, &done).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, subtraction);
        assert!(graph.missing_prerequisites(Uuid::new_v4(), &done).is_err());
    }

    #[test]
    fn difficulty_suggestions() {
        let few = NodeAttemptStats { attempts: 5, passes: 0 };
        assert_eq!(suggest_difficulty(few), None);
        let easy = NodeAttemptStats { attempts: 20, passes: 19 };
        assert_eq!(suggest_difficulty(easy), Some(1));
        let mid = NodeAttemptStats { attempts: 40, passes: 24 };
        assert_eq!(suggest_difficulty(mid), Some(3));
        let hard = NodeAttemptStats { attempts: 40, passes: 4 };
        assert_eq!(suggest_difficulty(hard), Some(5));
    }

    #[test]
    fn calibration_reports_only_changes() {
        let mut steady = node("Steady", 0, vec![]);
        steady.difficulty = 3;
        let mut drifting = node("Drifting", 1, vec![]);
        drifting.difficulty = 2;

        let stats: HashMap<Uuid, NodeAttemptStats> = [
            (steady.id, NodeAttemptStats { attempts: 40, passes: 24 }),
            (drifting.id, NodeAttemptStats { attempts: 30, passes: 3 }),
        ]
        .into_iter()
        .collect();

        let adjustments = calibrate(&[steady, drifting.clone()], &stats);
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].node_id, drifting.id);
        assert_eq!(adjustments[0].previous, 2);
        assert_eq!(adjustments[0].suggested, 5);
    }
}
