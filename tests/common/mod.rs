//! Shared fixtures for service tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use learnpath::domain::{
    Actor, Class, NodeProgress, NodeStatus, SkillNode, Subject, SubjectProgress, User, UserRole,
};
use learnpath::errors::AppResult;
use learnpath::infra::repositories::{
    MockClassRepository, MockProgressRepository, MockSchoolRepository, MockSkillTreeRepository,
    MockSubjectRepository, MockUserRepository,
};
use learnpath::infra::{
    ClassRepository, MockTxProgressRepository, MockTxSchoolRepository, MockTxSkillTreeRepository,
    MockTxUserRepository, ProgressRepository, SchoolRepository, SkillTreeRepository,
    SubjectRepository, TransactionContext, TxFuture, UnitOfWork, UserRepository,
};

/// Mocks for every repository. Set expectations, then call `build`.
///
/// The `tx_*` mocks serve calls made inside `UnitOfWork::transaction`.
#[derive(Default)]
pub struct Mocks {
    pub users: MockUserRepository,
    pub schools: MockSchoolRepository,
    pub classes: MockClassRepository,
    pub subjects: MockSubjectRepository,
    pub skill_tree: MockSkillTreeRepository,
    pub progress: MockProgressRepository,
    pub tx_users: MockTxUserRepository,
    pub tx_schools: MockTxSchoolRepository,
    pub tx_skill_tree: MockTxSkillTreeRepository,
    pub tx_progress: MockTxProgressRepository,
}

impl Mocks {
    pub fn build(self) -> Arc<TestUnitOfWork> {
        Arc::new(TestUnitOfWork {
            users: Arc::new(self.users),
            schools: Arc::new(self.schools),
            classes: Arc::new(self.classes),
            subjects: Arc::new(self.subjects),
            skill_tree: Arc::new(self.skill_tree),
            progress: Arc::new(self.progress),
            tx_users: self.tx_users,
            tx_schools: self.tx_schools,
            tx_skill_tree: self.tx_skill_tree,
            tx_progress: self.tx_progress,
            serial: tokio::sync::Mutex::new(()),
        })
    }
}

/// Unit of Work over mock repositories
pub struct TestUnitOfWork {
    users: Arc<MockUserRepository>,
    schools: Arc<MockSchoolRepository>,
    classes: Arc<MockClassRepository>,
    subjects: Arc<MockSubjectRepository>,
    skill_tree: Arc<MockSkillTreeRepository>,
    progress: Arc<MockProgressRepository>,
    tx_users: MockTxUserRepository,
    tx_schools: MockTxSchoolRepository,
    tx_skill_tree: MockTxSkillTreeRepository,
    tx_progress: MockTxProgressRepository,
    /// Transactions run one at a time, like writers queued on a row lock
    serial: tokio::sync::Mutex<()>,
}

#[async_trait]
impl UnitOfWork for TestUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn schools(&self) -> Arc<dyn SchoolRepository> {
        self.schools.clone()
    }

    fn classes(&self) -> Arc<dyn ClassRepository> {
        self.classes.clone()
    }

    fn subjects(&self) -> Arc<dyn SubjectRepository> {
        self.subjects.clone()
    }

    fn skill_tree(&self) -> Arc<dyn SkillTreeRepository> {
        self.skill_tree.clone()
    }

    fn progress(&self) -> Arc<dyn ProgressRepository> {
        self.progress.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        let _lock = self.serial.lock().await;
        // Let concurrent callers run up to the lock before this body proceeds
        tokio::task::yield_now().await;
        f(TransactionContext::new(
            &self.tx_users,
            &self.tx_schools,
            &self.tx_skill_tree,
            &self.tx_progress,
        ))
        .await
    }
}

pub fn actor(role: UserRole, school_id: Uuid) -> Actor {
    Actor::new(Uuid::new_v4(), role, school_id)
}

pub fn user(id: Uuid, school_id: Uuid, role: UserRole, name: &str) -> User {
    User {
        id,
        school_id,
        email: format!("{}@school.edu", name.to_lowercase()),
        password_hash: "hashed".to_string(),
        name: name.to_string(),
        role,
        xp: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

/// The user row behind an actor
pub fn user_for(actor: &Actor, name: &str) -> User {
    user(actor.id, actor.school_id, actor.role, name)
}

pub fn class(id: Uuid, school_id: Uuid, teacher_id: Option<Uuid>) -> Class {
    Class {
        id,
        school_id,
        name: "7B".to_string(),
        grade_level: 7,
        teacher_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn subject(id: Uuid, school_id: Uuid) -> Subject {
    Subject {
        id,
        school_id,
        name: "Algebra".to_string(),
        code: "MATH-7".to_string(),
        description: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn node(subject_id: Uuid, title: &str, prerequisites: Vec<Uuid>) -> SkillNode {
    SkillNode {
        id: Uuid::new_v4(),
        subject_id,
        title: title.to_string(),
        description: None,
        difficulty: 2,
        xp_reward: 40,
        position: 0,
        prerequisites,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn completed(student_id: Uuid, node: &SkillNode) -> NodeProgress {
    NodeProgress {
        status: NodeStatus::Completed,
        attempts: 1,
        passes: 1,
        best_score: 1.0,
        completed_at: Some(Utc::now()),
        ..NodeProgress::start(student_id, node.id, node.subject_id, Utc::now())
    }
}

pub fn subject_progress(student_id: Uuid, subject_id: Uuid, correct: i64, total: i64) -> SubjectProgress {
    SubjectProgress {
        total_attempts: total,
        correct_answers: correct,
        ..SubjectProgress::start(student_id, subject_id, Utc::now())
    }
}
