use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use super::entities::school::{ActiveModel, Entity as SchoolEntity};
use crate::domain::{NewSchool, School, SchoolChanges};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SchoolRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<School>>;

    async fn update(&self, id: Uuid, changes: SchoolChanges) -> AppResult<School>;
}

/// Schools are only created together with their owner, inside a transaction.
pub(crate) async fn insert_school<C: ConnectionTrait>(db: &C, school: NewSchool) -> AppResult<School> {
    let now = chrono::Utc::now();
    let active_model = ActiveModel {
        id: Set(school.id),
        name: Set(school.name),
        address: Set(school.address),
        owner_id: Set(school.owner_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active_model.insert(db).await.map_err(AppError::from)?;
    Ok(School::from(model))
}

pub struct SchoolStore {
    db: DatabaseConnection,
}

impl SchoolStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SchoolRepository for SchoolStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<School>> {
        let result = SchoolEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(School::from))
    }

    async fn update(&self, id: Uuid, changes: SchoolChanges) -> AppResult<School> {
        let school = SchoolEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = school.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(address) = changes.address {
            active.address = Set(Some(address));
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(School::from(model))
    }
}
