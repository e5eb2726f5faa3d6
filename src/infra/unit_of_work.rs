//! Unit of Work: one entry point to every repository, plus transactions
//! for workflows that span several aggregates.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::{
    apply_node_changes, find_user_by_email_with_deleted, insert_node, insert_school, insert_user,
    load_achievements, load_all_subject_progress, load_node_progress, load_nodes, load_streak,
    load_subject_progress, lock_subject, lock_user, write_attempt, AttemptRecord, ClassRepository,
    ClassStore, ProgressRepository, ProgressStore, SchoolRepository, SchoolStore,
    SkillTreeRepository, SkillTreeStore, SubjectRepository, SubjectStore, UserRepository,
    UserStore,
};
use crate::domain::{
    NewSchool, NewSkillNode, NewUser, NodeProgress, School, SkillNode, SkillNodeChanges, Streak,
    SubjectProgress, UnlockedAchievement, User,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Boxed future returned by a transaction body.
pub type TxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>>;

/// Repository access and transaction management.
///
/// Not object safe because of the generic `transaction`; services take it
/// as a type parameter.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn schools(&self) -> Arc<dyn SchoolRepository>;

    fn classes(&self) -> Arc<dyn ClassRepository>;

    fn subjects(&self) -> Arc<dyn SubjectRepository>;

    fn skill_tree(&self) -> Arc<dyn SkillTreeRepository>;

    fn progress(&self) -> Arc<dyn ProgressRepository>;

    /// Run `f` inside a ReadCommitted transaction.
    ///
    /// Committed when `f` succeeds, rolled back when it fails.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// User access inside a transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxUserRepository: Send + Sync {
    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;

    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Active user, row-locked until the transaction ends
    async fn lock(&self, id: Uuid) -> AppResult<Option<User>>;
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxSchoolRepository: Send + Sync {
    async fn create(&self, school: NewSchool) -> AppResult<School>;
}

/// Prerequisite graph edits inside a transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxSkillTreeRepository: Send + Sync {
    /// Row-lock the subject; `NotFound` when it does not exist
    async fn lock_subject(&self, subject_id: Uuid) -> AppResult<()>;

    async fn list_nodes(&self, subject_id: Uuid) -> AppResult<Vec<SkillNode>>;

    async fn create_node(&self, node: NewSkillNode) -> AppResult<SkillNode>;

    async fn update_node(&self, id: Uuid, changes: SkillNodeChanges) -> AppResult<SkillNode>;
}

/// A student's progress rows inside a transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxProgressRepository: Send + Sync {
    async fn node_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Vec<NodeProgress>>;

    async fn subject_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Option<SubjectProgress>>;

    async fn all_subject_progress(&self, student_id: Uuid) -> AppResult<Vec<SubjectProgress>>;

    async fn streak(&self, student_id: Uuid) -> AppResult<Option<Streak>>;

    async fn achievements(&self, student_id: Uuid) -> AppResult<Vec<UnlockedAchievement>>;

    /// Upsert the attempt's rows and add its XP to the student
    async fn record_attempt(&self, record: AttemptRecord) -> AppResult<()>;
}

/// Repository access bound to an open transaction.
pub struct TransactionContext<'a> {
    users: &'a dyn TxUserRepository,
    schools: &'a dyn TxSchoolRepository,
    skill_tree: &'a dyn TxSkillTreeRepository,
    progress: &'a dyn TxProgressRepository,
}

impl<'a> TransactionContext<'a> {
    pub fn new(
        users: &'a dyn TxUserRepository,
        schools: &'a dyn TxSchoolRepository,
        skill_tree: &'a dyn TxSkillTreeRepository,
        progress: &'a dyn TxProgressRepository,
    ) -> Self {
        Self {
            users,
            schools,
            skill_tree,
            progress,
        }
    }

    pub fn users(&self) -> &'a dyn TxUserRepository {
        self.users
    }

    pub fn schools(&self) -> &'a dyn TxSchoolRepository {
        self.schools
    }

    pub fn skill_tree(&self) -> &'a dyn TxSkillTreeRepository {
        self.skill_tree
    }

    pub fn progress(&self) -> &'a dyn TxProgressRepository {
        self.progress
    }
}

/// SeaORM-backed Unit of Work.
pub struct Persistence {
    db: DatabaseConnection,
    users: Arc<UserStore>,
    schools: Arc<SchoolStore>,
    classes: Arc<ClassStore>,
    subjects: Arc<SubjectStore>,
    skill_tree: Arc<SkillTreeStore>,
    progress: Arc<ProgressStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            schools: Arc::new(SchoolStore::new(db.clone())),
            classes: Arc::new(ClassStore::new(db.clone())),
            subjects: Arc::new(SubjectStore::new(db.clone())),
            skill_tree: Arc::new(SkillTreeStore::new(db.clone())),
            progress: Arc::new(ProgressStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
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
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let result = {
            let store = TxStore { txn: &txn };
            f(TransactionContext::new(&store, &store, &store, &store)).await
        };

        match result {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Every transactional repository over one open transaction.
struct TxStore<'t> {
    txn: &'t DatabaseTransaction,
}

#[async_trait]
impl TxUserRepository for TxStore<'_> {
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        find_user_by_email_with_deleted(self.txn, email).await
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        insert_user(self.txn, user).await
    }

    async fn lock(&self, id: Uuid) -> AppResult<Option<User>> {
        lock_user(self.txn, id).await
    }
}

#[async_trait]
impl TxSchoolRepository for TxStore<'_> {
    async fn create(&self, school: NewSchool) -> AppResult<School> {
        insert_school(self.txn, school).await
    }
}

#[async_trait]
impl TxSkillTreeRepository for TxStore<'_> {
    async fn lock_subject(&self, subject_id: Uuid) -> AppResult<()> {
        lock_subject(self.txn, subject_id).await
    }

    async fn list_nodes(&self, subject_id: Uuid) -> AppResult<Vec<SkillNode>> {
        load_nodes(self.txn, subject_id).await
    }

    async fn create_node(&self, node: NewSkillNode) -> AppResult<SkillNode> {
        insert_node(self.txn, node).await
    }

    async fn update_node(&self, id: Uuid, changes: SkillNodeChanges) -> AppResult<SkillNode> {
        apply_node_changes(self.txn, id, changes).await
    }
}

#[async_trait]
impl TxProgressRepository for TxStore<'_> {
    async fn node_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Vec<NodeProgress>> {
        load_node_progress(self.txn, student_id, subject_id).await
    }

    async fn subject_progress(&self, student_id: Uuid, subject_id: Uuid) -> AppResult<Option<SubjectProgress>> {
        load_subject_progress(self.txn, student_id, subject_id).await
    }

    async fn all_subject_progress(&self, student_id: Uuid) -> AppResult<Vec<SubjectProgress>> {
        load_all_subject_progress(self.txn, student_id).await
    }

    async fn streak(&self, student_id: Uuid) -> AppResult<Option<Streak>> {
        load_streak(self.txn, student_id).await
    }

    async fn achievements(&self, student_id: Uuid) -> AppResult<Vec<UnlockedAchievement>> {
        load_achievements(self.txn, student_id).await
    }

    async fn record_attempt(&self, record: AttemptRecord) -> AppResult<()> {
        write_attempt(self.txn, record).await
    }
}

/// Run a block inside `$uow.transaction`.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
