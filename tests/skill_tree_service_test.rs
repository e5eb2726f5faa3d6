//! Skill tree service tests.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, completed, node, subject, user_for, Mocks};
use learnpath::domain::{
    NodeAttemptStats, NodeStatus, SkillGraph, SkillNode, SkillNodeChanges, UserRole,
};
use learnpath::errors::AppError;
use learnpath::services::{NodeInput, SkillTreeManager, SkillTreeService};

fn input(prerequisites: Vec<Uuid>) -> NodeInput {
    NodeInput {
        title: " Quadratics ".to_string(),
        description: None,
        difficulty: 3,
        xp_reward: 60,
        position: 1,
        prerequisites,
    }
}

#[tokio::test]
async fn create_node_with_known_prerequisite() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let subject_id = Uuid::new_v4();
    let basics = node(subject_id, "Linear equations", vec![]);
    let basics_id = basics.id;

    let mut mocks = Mocks::default();
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks
        .tx_skill_tree
        .expect_lock_subject()
        .with(eq(subject_id))
        .times(1)
        .returning(|_| Ok(()));
    mocks
        .tx_skill_tree
        .expect_list_nodes()
        .with(eq(subject_id))
        .returning(move |_| Ok(vec![basics.clone()]));
    mocks
        .tx_skill_tree
        .expect_create_node()
        .withf(move |new| new.title == "Quadratics" && new.prerequisites == vec![basics_id])
        .times(1)
        .returning(|new| {
            let mut created = common::node(new.subject_id, &new.title, new.prerequisites);
            created.difficulty = new.difficulty;
            Ok(created)
        });

    let service = SkillTreeManager::new(mocks.build());
    let created = service
        .create_node(teacher, subject_id, input(vec![basics_id, basics_id]))
        .await
        .unwrap();

    assert_eq!(created.prerequisites, vec![basics_id]);
    assert_eq!(created.difficulty, 3);
}

#[tokio::test]
async fn create_node_rejects_unknown_prerequisite() {
    let school_id = Uuid::new_v4();
    let owner = actor(UserRole::SchoolOwner, school_id);

    let mut mocks = Mocks::default();
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks.tx_skill_tree.expect_lock_subject().returning(|_| Ok(()));
    mocks.tx_skill_tree.expect_list_nodes().returning(|_| Ok(vec![]));
    mocks.tx_skill_tree.expect_create_node().never();

    let service = SkillTreeManager::new(mocks.build());
    let result = service
        .create_node(owner, Uuid::new_v4(), input(vec![Uuid::new_v4()]))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn students_cannot_edit_the_tree() {
    let student = actor(UserRole::Student, Uuid::new_v4());
    let service = SkillTreeManager::new(Mocks::default().build());

    let result = service.create_node(student, Uuid::new_v4(), input(vec![])).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn update_rejects_prerequisite_cycle() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let subject_id = Uuid::new_v4();
    let a = node(subject_id, "Counting", vec![]);
    let b = node(subject_id, "Addition", vec![a.id]);
    let c = node(subject_id, "Multiplication", vec![b.id]);
    let (a_id, c_id) = (a.id, c.id);
    let nodes = vec![a.clone(), b, c];

    let mut mocks = Mocks::default();
    mocks
        .skill_tree
        .expect_find_node()
        .with(eq(a_id))
        .returning(move |_| Ok(Some(a.clone())));
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks.tx_skill_tree.expect_lock_subject().returning(|_| Ok(()));
    mocks
        .tx_skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(nodes.clone()));
    mocks.tx_skill_tree.expect_update_node().never();

    let service = SkillTreeManager::new(mocks.build());
    let result = service
        .update_node(
            teacher,
            a_id,
            SkillNodeChanges {
                prerequisites: Some(vec![c_id]),
                ..Default::default()
            },
        )
        .await;

    match result {
        Err(AppError::Validation(msg)) => assert!(msg.contains("cycle"), "{}", msg),
        other => panic!("expected cycle error, got {:?}", other),
    }
}

#[tokio::test]
async fn crossing_edits_cannot_both_land() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let subject_id = Uuid::new_v4();
    let a = node(subject_id, "Fractions", vec![]);
    let b = node(subject_id, "Decimals", vec![]);
    let (a_id, b_id) = (a.id, b.id);
    let stored: Arc<Mutex<Vec<SkillNode>>> = Arc::new(Mutex::new(vec![a, b]));

    let mut mocks = Mocks::default();
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    let nodes = stored.clone();
    mocks
        .skill_tree
        .expect_find_node()
        .returning(move |id| Ok(nodes.lock().unwrap().iter().find(|n| n.id == id).cloned()));
    mocks.tx_skill_tree.expect_lock_subject().returning(|_| Ok(()));
    let nodes = stored.clone();
    mocks
        .tx_skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(nodes.lock().unwrap().clone()));
    let nodes = stored.clone();
    mocks
        .tx_skill_tree
        .expect_update_node()
        .times(1)
        .returning(move |id, changes| {
            let mut nodes = nodes.lock().unwrap();
            let node = nodes.iter_mut().find(|n| n.id == id).unwrap();
            if let Some(prerequisites) = changes.prerequisites {
                node.prerequisites = prerequisites;
            }
            Ok(node.clone())
        });

    let service = SkillTreeManager::new(mocks.build());
    let requires = |prerequisite: Uuid| SkillNodeChanges {
        prerequisites: Some(vec![prerequisite]),
        ..Default::default()
    };
    // A after B and B after A: each check alone sees an acyclic graph
    let (first, second) = tokio::join!(
        service.update_node(teacher, a_id, requires(b_id)),
        service.update_node(teacher, b_id, requires(a_id)),
    );

    assert!(first.is_ok());
    match second {
        Err(AppError::Validation(msg)) => assert!(msg.contains("cycle"), "{}", msg),
        other => panic!("expected cycle error, got {:?}", other),
    }
    assert!(SkillGraph::new(stored.lock().unwrap().clone()).is_ok());
}

#[tokio::test]
async fn blank_description_clears_it() {
    let school_id = Uuid::new_v4();
    let teacher = actor(UserRole::Teacher, school_id);
    let subject_id = Uuid::new_v4();
    let mut described = node(subject_id, "Ratios", vec![]);
    described.description = Some("Comparing quantities".to_string());
    let id = described.id;

    let mut mocks = Mocks::default();
    mocks
        .skill_tree
        .expect_find_node()
        .returning(move |_| Ok(Some(described.clone())));
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks.tx_skill_tree.expect_lock_subject().returning(|_| Ok(()));
    mocks.tx_skill_tree.expect_list_nodes().never();
    mocks
        .tx_skill_tree
        .expect_update_node()
        .withf(|_, changes| changes.description == Some(None))
        .times(1)
        .returning(move |id, _| {
            let mut cleared = common::node(subject_id, "Ratios", vec![]);
            cleared.id = id;
            Ok(cleared)
        });

    let service = SkillTreeManager::new(mocks.build());
    let updated = service
        .update_node(
            teacher,
            id,
            SkillNodeChanges {
                description: Some(Some("  ".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, id);
    assert_eq!(updated.description, None);
}

#[tokio::test]
async fn nodes_of_other_schools_are_not_found() {
    let teacher = actor(UserRole::Teacher, Uuid::new_v4());
    let subject_id = Uuid::new_v4();
    let foreign = node(subject_id, "Foreign", vec![]);
    let foreign_id = foreign.id;

    let mut mocks = Mocks::default();
    mocks
        .skill_tree
        .expect_find_node()
        .returning(move |_| Ok(Some(foreign.clone())));
    mocks
        .subjects
        .expect_find_by_id()
        .returning(|id| Ok(Some(subject(id, Uuid::new_v4()))));

    let service = SkillTreeManager::new(mocks.build());
    let result = service.get_node(teacher, foreign_id).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn student_tree_marks_status_per_node() {
    let school_id = Uuid::new_v4();
    let student = actor(UserRole::Student, school_id);
    let subject_id = Uuid::new_v4();
    let a = node(subject_id, "Counting", vec![]);
    let b = node(subject_id, "Addition", vec![a.id]);
    let c = node(subject_id, "Multiplication", vec![b.id]);
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    let done = completed(student.id, &a);
    let nodes = vec![a, b, c];
    let student_row = user_for(&student, "Mia");

    let mut mocks = Mocks::default();
    mocks
        .subjects
        .expect_find_by_id()
        .returning(move |id| Ok(Some(subject(id, school_id))));
    mocks
        .users
        .expect_find_by_id()
        .returning(move |_| Ok(Some(student_row.clone())));
    mocks
        .skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(nodes.clone()));
    mocks
        .progress
        .expect_node_progress()
        .returning(move |_, _| Ok(vec![done.clone()]));

    let service = SkillTreeManager::new(mocks.build());
    let tree = service
        .get_student_tree(student, subject_id, student.id)
        .await
        .unwrap();

    let status: HashMap<Uuid, NodeStatus> = tree.iter().map(|n| (n.node.id, n.status)).collect();
    assert_eq!(status[&a_id], NodeStatus::Completed);
    assert_eq!(status[&b_id], NodeStatus::Available);
    assert_eq!(status[&c_id], NodeStatus::Locked);

    let order: Vec<Uuid> = tree.iter().map(|n| n.node.id).collect();
    assert_eq!(order, vec![a_id, b_id, c_id]);
    assert_eq!(tree[2].depth, 2);
}

#[tokio::test]
async fn dry_run_calibration_writes_nothing() {
    let subject_id = Uuid::new_v4();
    let easy = node(subject_id, "Counting", vec![]);
    let easy_id = easy.id;

    let mut mocks = Mocks::default();
    mocks
        .skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(vec![easy.clone()]));
    mocks.skill_tree.expect_attempt_stats().returning(move |_| {
        Ok(HashMap::from([(
            easy_id,
            NodeAttemptStats {
                attempts: 40,
                passes: 38,
            },
        )]))
    });
    mocks.skill_tree.expect_set_difficulties().never();

    let service = SkillTreeManager::new(mocks.build());
    let report = service.recalibrate(subject_id, true).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.adjustments.len(), 1);
    assert_eq!(report.adjustments[0].previous, 2);
    assert_eq!(report.adjustments[0].suggested, 1);
}

#[tokio::test]
async fn calibration_applies_suggestions() {
    let subject_id = Uuid::new_v4();
    let hard = node(subject_id, "Proofs", vec![]);
    let hard_id = hard.id;

    let mut mocks = Mocks::default();
    mocks
        .skill_tree
        .expect_list_nodes()
        .returning(move |_| Ok(vec![hard.clone()]));
    mocks.skill_tree.expect_attempt_stats().returning(move |_| {
        Ok(HashMap::from([(
            hard_id,
            NodeAttemptStats {
                attempts: 25,
                passes: 5,
            },
        )]))
    });
    mocks
        .skill_tree
        .expect_set_difficulties()
        .with(eq(vec![(hard_id, 5)]))
        .times(1)
        .returning(|_| Ok(()));

    let service = SkillTreeManager::new(mocks.build());
    let report = service.recalibrate(subject_id, false).await.unwrap();

    assert!(!report.dry_run);
    assert_eq!(report.adjustments[0].suggested, 5);
}
