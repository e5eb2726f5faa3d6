//! Classes and their student enrollments.

use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::class::{self, ActiveModel, Entity as ClassEntity};
use super::entities::class_student::{self, Entity as ClassStudentEntity};
use crate::domain::{Class, ClassChanges, Enrollment, NewClass};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ClassRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Class>>;

    async fn list_by_school(&self, school_id: Uuid) -> AppResult<Vec<Class>>;

    async fn list_by_teacher(&self, teacher_id: Uuid) -> AppResult<Vec<Class>>;

    async fn list_by_student(&self, student_id: Uuid) -> AppResult<Vec<Class>>;

    async fn create(&self, class: NewClass) -> AppResult<Class>;

    async fn update(&self, id: Uuid, changes: ClassChanges) -> AppResult<Class>;

    async fn set_teacher(&self, id: Uuid, teacher_id: Option<Uuid>) -> AppResult<Class>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Enroll students; existing enrollments are left untouched
    async fn enroll(&self, class_id: Uuid, student_ids: Vec<Uuid>) -> AppResult<()>;

    /// Returns `false` when the student was not enrolled
    async fn remove_student(&self, class_id: Uuid, student_id: Uuid) -> AppResult<bool>;

    async fn student_ids(&self, class_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Enrollments of every class in `class_ids`
    async fn enrollments(&self, class_ids: Vec<Uuid>) -> AppResult<Vec<Enrollment>>;

    /// Whether `student_id` sits in any class taught by `teacher_id`
    async fn teaches_student(&self, teacher_id: Uuid, student_id: Uuid) -> AppResult<bool>;
}

pub struct ClassStore {
    db: DatabaseConnection,
}

impl ClassStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> AppResult<class::Model> {
        ClassEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl ClassRepository for ClassStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Class>> {
        let result = ClassEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Class::from))
    }

    async fn list_by_school(&self, school_id: Uuid) -> AppResult<Vec<Class>> {
        let models = ClassEntity::find()
            .filter(class::Column::SchoolId.eq(school_id))
            .order_by_asc(class::Column::GradeLevel)
            .order_by_asc(class::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Class::from).collect())
    }

    async fn list_by_teacher(&self, teacher_id: Uuid) -> AppResult<Vec<Class>> {
        let models = ClassEntity::find()
            .filter(class::Column::TeacherId.eq(teacher_id))
            .order_by_asc(class::Column::GradeLevel)
            .order_by_asc(class::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Class::from).collect())
    }

    async fn list_by_student(&self, student_id: Uuid) -> AppResult<Vec<Class>> {
        let class_ids: Vec<Uuid> = ClassStudentEntity::find()
            .filter(class_student::Column::StudentId.eq(student_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| e.class_id)
            .collect();

        if class_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = ClassEntity::find()
            .filter(class::Column::Id.is_in(class_ids))
            .order_by_asc(class::Column::GradeLevel)
            .order_by_asc(class::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Class::from).collect())
    }

    async fn create(&self, class: NewClass) -> AppResult<Class> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            school_id: Set(class.school_id),
            name: Set(class.name),
            grade_level: Set(class.grade_level),
            teacher_id: Set(class.teacher_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Class::from(model))
    }

    async fn update(&self, id: Uuid, changes: ClassChanges) -> AppResult<Class> {
        let mut active: ActiveModel = self.find_model(id).await?.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(grade_level) = changes.grade_level {
            active.grade_level = Set(grade_level);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Class::from(model))
    }

    async fn set_teacher(&self, id: Uuid, teacher_id: Option<Uuid>) -> AppResult<Class> {
        let mut active: ActiveModel = self.find_model(id).await?.into();
        active.teacher_id = Set(teacher_id);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Class::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = ClassEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn enroll(&self, class_id: Uuid, student_ids: Vec<Uuid>) -> AppResult<()> {
        if student_ids.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now();
        let rows = student_ids.into_iter().map(|student_id| class_student::ActiveModel {
            class_id: Set(class_id),
            student_id: Set(student_id),
            enrolled_at: Set(now),
        });

        ClassStudentEntity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    class_student::Column::ClassId,
                    class_student::Column::StudentId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn remove_student(&self, class_id: Uuid, student_id: Uuid) -> AppResult<bool> {
        let result = ClassStudentEntity::delete_by_id((class_id, student_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn student_ids(&self, class_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = ClassStudentEntity::find()
            .select_only()
            .column(class_student::Column::StudentId)
            .filter(class_student::Column::ClassId.eq(class_id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn enrollments(&self, class_ids: Vec<Uuid>) -> AppResult<Vec<Enrollment>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = ClassStudentEntity::find()
            .filter(class_student::Column::ClassId.is_in(class_ids))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Enrollment::from).collect())
    }

    async fn teaches_student(&self, teacher_id: Uuid, student_id: Uuid) -> AppResult<bool> {
        let taught: Vec<Uuid> = ClassEntity::find()
            .select_only()
            .column(class::Column::Id)
            .filter(class::Column::TeacherId.eq(teacher_id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;

        if taught.is_empty() {
            return Ok(false);
        }

        let found = ClassStudentEntity::find()
            .filter(class_student::Column::ClassId.is_in(taught))
            .filter(class_student::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}
