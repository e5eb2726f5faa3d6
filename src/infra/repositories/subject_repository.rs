use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::subject::{self, ActiveModel, Entity as SubjectEntity};
use crate::domain::{NewSubject, Subject, SubjectChanges};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Subject>>;

    /// Look up a subject by its normalized code within a school
    async fn find_by_code(&self, school_id: Uuid, code: &str) -> AppResult<Option<Subject>>;

    async fn list_by_school(&self, school_id: Uuid) -> AppResult<Vec<Subject>>;

    async fn count_by_school(&self, school_id: Uuid) -> AppResult<u64>;

    /// Ids of every subject across all schools
    async fn list_ids(&self) -> AppResult<Vec<Uuid>>;

    async fn create(&self, subject: NewSubject) -> AppResult<Subject>;

    async fn update(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject>;

    /// Deletes the subject with its skill tree and progress
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct SubjectStore {
    db: DatabaseConnection,
}

impl SubjectStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubjectRepository for SubjectStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Subject>> {
        let result = SubjectEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Subject::from))
    }

    async fn find_by_code(&self, school_id: Uuid, code: &str) -> AppResult<Option<Subject>> {
        let result = SubjectEntity::find()
            .filter(subject::Column::SchoolId.eq(school_id))
            .filter(subject::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Subject::from))
    }

    async fn list_by_school(&self, school_id: Uuid) -> AppResult<Vec<Subject>> {
        let models = SubjectEntity::find()
            .filter(subject::Column::SchoolId.eq(school_id))
            .order_by_asc(subject::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Subject::from).collect())
    }

    async fn count_by_school(&self, school_id: Uuid) -> AppResult<u64> {
        SubjectEntity::find()
            .filter(subject::Column::SchoolId.eq(school_id))
            .count(&self.db)
            .await
            .map_err(AppError::from)
    }

    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        let models = SubjectEntity::find()
            .order_by_asc(subject::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(|m| m.id).collect())
    }

    async fn create(&self, subject: NewSubject) -> AppResult<Subject> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            school_id: Set(subject.school_id),
            name: Set(subject.name),
            code: Set(subject.code),
            description: Set(subject.description),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Subject::from(model))
    }

    async fn update(&self, id: Uuid, changes: SubjectChanges) -> AppResult<Subject> {
        let subject = SubjectEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = subject.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(code) = changes.code {
            active.code = Set(code);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Subject::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = SubjectEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
