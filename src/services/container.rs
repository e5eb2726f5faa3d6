//! Service container plus helpers for running independent async work
//! concurrently.

use std::future::Future;
use std::sync::Arc;

use super::{
    AnalyticsManager, AnalyticsService, AuthService, Authenticator, ChatManager, ChatService,
    ClassManager, ClassService, GamificationManager, GamificationService, ProgressManager,
    ProgressService, SchoolManager, SchoolService, SkillTreeManager, SkillTreeService,
    SubjectManager, SubjectService, UserManager, UserService,
};
use crate::config::Config;
use crate::domain::{RuleTutor, Tutor};
use crate::errors::AppResult;
use crate::infra::Persistence;

/// Every application service, built over one shared Unit of Work.
#[derive(Clone)]
pub struct Services {
    auth: Arc<dyn AuthService>,
    users: Arc<dyn UserService>,
    schools: Arc<dyn SchoolService>,
    classes: Arc<dyn ClassService>,
    subjects: Arc<dyn SubjectService>,
    skill_tree: Arc<dyn SkillTreeService>,
    progress: Arc<dyn ProgressService>,
    gamification: Arc<dyn GamificationService>,
    analytics: Arc<dyn AnalyticsService>,
    chat: Arc<dyn ChatService>,
}

impl Services {
    /// Build the services over a database connection, answering chat with
    /// the keyword tutor.
    pub fn from_connection(db: sea_orm::DatabaseConnection, config: Config) -> Self {
        Self::with_tutor(db, config, Arc::new(RuleTutor))
    }

    pub fn with_tutor(db: sea_orm::DatabaseConnection, config: Config, tutor: Arc<dyn Tutor>) -> Self {
        let uow = Arc::new(Persistence::new(db));

        Self {
            auth: Arc::new(Authenticator::new(uow.clone(), config)),
            users: Arc::new(UserManager::new(uow.clone())),
            schools: Arc::new(SchoolManager::new(uow.clone())),
            classes: Arc::new(ClassManager::new(uow.clone())),
            subjects: Arc::new(SubjectManager::new(uow.clone())),
            skill_tree: Arc::new(SkillTreeManager::new(uow.clone())),
            progress: Arc::new(ProgressManager::new(uow.clone())),
            gamification: Arc::new(GamificationManager::new(uow.clone())),
            analytics: Arc::new(AnalyticsManager::new(uow.clone())),
            chat: Arc::new(ChatManager::new(uow, tutor)),
        }
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    pub fn users(&self) -> Arc<dyn UserService> {
        self.users.clone()
    }

    pub fn schools(&self) -> Arc<dyn SchoolService> {
        self.schools.clone()
    }

    pub fn classes(&self) -> Arc<dyn ClassService> {
        self.classes.clone()
    }

    pub fn subjects(&self) -> Arc<dyn SubjectService> {
        self.subjects.clone()
    }

    pub fn skill_tree(&self) -> Arc<dyn SkillTreeService> {
        self.skill_tree.clone()
    }

    pub fn progress(&self) -> Arc<dyn ProgressService> {
        self.progress.clone()
    }

    pub fn gamification(&self) -> Arc<dyn GamificationService> {
        self.gamification.clone()
    }

    pub fn analytics(&self) -> Arc<dyn AnalyticsService> {
        self.analytics.clone()
    }

    pub fn chat(&self) -> Arc<dyn ChatService> {
        self.chat.clone()
    }
}

/// Run independent fallible futures concurrently.
pub mod parallel {
    use super::*;
    use tokio::try_join;

    /// Both results, or the first error.
    ///
    /// ```ignore
    /// let (nodes, records) = parallel::join2(
    ///     skill_tree.list_nodes(subject_id),
    ///     progress.node_progress_for_subject(subject_id),
    /// ).await?;
    /// ```
    pub async fn join2<F1, F2, T1, T2>(f1: F1, f2: F2) -> AppResult<(T1, T2)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
    {
        try_join!(f1, f2)
    }

    pub async fn join4<F1, F2, F3, F4, T1, T2, T3, T4>(
        f1: F1,
        f2: F2,
        f3: F3,
        f4: F4,
    ) -> AppResult<(T1, T2, T3, T4)>
    where
        F1: Future<Output = AppResult<T1>>,
        F2: Future<Output = AppResult<T2>>,
        F3: Future<Output = AppResult<T3>>,
        F4: Future<Output = AppResult<T4>>,
    {
        try_join!(f1, f2, f3, f4)
    }

    /// Await every future; results keep the input order.
    pub async fn join_all<F, T>(futures: Vec<F>) -> AppResult<Vec<T>>
    where
        F: Future<Output = AppResult<T>>,
    {
        futures::future::join_all(futures).await.into_iter().collect()
    }
}

/// Bulk processing in fixed-size concurrent chunks.
pub mod batch {
    use super::*;
    use crate::errors::AppError;

    /// Apply `processor` to every item, `batch_size` items at a time.
    ///
    /// ```ignore
    /// let reports = batch::process(subject_ids, CALIBRATION_BATCH_SIZE, |id| {
    ///     skill_tree.recalibrate(id, dry_run)
    /// }).await?;
    /// ```
    pub async fn process<T, R, F, Fut>(items: Vec<T>, batch_size: usize, processor: F) -> AppResult<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> Fut + Send + Sync,
        Fut: Future<Output = AppResult<R>> + Send,
    {
        if batch_size == 0 {
            return Err(AppError::validation("batch_size must be greater than 0"));
        }

        let mut results = Vec::with_capacity(items.len());
        let mut remaining = items;

        while !remaining.is_empty() {
            let take = batch_size.min(remaining.len());
            let chunk: Vec<Fut> = remaining.drain(..take).map(&processor).collect();
            results.extend(parallel::join_all(chunk).await?);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn join2_returns_both_results() {
        let (a, b) = parallel::join2(async { Ok::<_, AppError>(1) }, async { Ok::<_, AppError>("two") }).await.unwrap();
        assert_eq!((a, b), (1, "two"));
    }

    #[tokio::test]
    async fn join_all_keeps_input_order() {
        let futures: Vec<_> = (0..5).map(|i| async move { Ok(i) as AppResult<i32> }).collect();
        assert_eq!(parallel::join_all(futures).await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn join_all_surfaces_errors() {
        let futures: Vec<_> = (0..3)
            .map(|i| async move {
                if i == 1 {
                    Err(AppError::NotFound)
                } else {
                    Ok(i)
                }
            })
            .collect();
        assert!(matches!(parallel::join_all(futures).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn batch_processes_every_item_in_order() {
        let doubled = batch::process((1..=7).collect(), 3, |n: i32| async move { Ok::<_, AppError>(n * 2) })
            .await
            .unwrap();
        assert_eq!(doubled, vec![2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn batch_rejects_zero_size() {
        let result = batch::process(vec![1], 0, |n: i32| async move { Ok::<_, AppError>(n) }).await;
        assert!(result.is_err());
    }
}
