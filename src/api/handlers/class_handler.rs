//! Classes and enrollment.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Class, ClassChanges, UserResponse};
use crate::errors::AppResult;
use crate::services::ClassInput;
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 100, message = "Class name is required"))]
    #[schema(example = "7B")]
    pub name: String,
    #[validate(range(min = 1, max = 13, message = "Grade level must be between 1 and 13"))]
    #[schema(example = 7)]
    pub grade_level: i32,
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateClassRequest {
    #[validate(length(min = 1, max = 100, message = "Class name cannot be empty"))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 13, message = "Grade level must be between 1 and 13"))]
    pub grade_level: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignTeacherRequest {
    /// `null` removes the current teacher
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EnrollStudentsRequest {
    #[validate(length(min = 1, message = "At least one student is required"))]
    pub student_ids: Vec<Uuid>,
}

pub fn class_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/:id", get(get_class).put(update_class).delete(delete_class))
        .route("/:id/teacher", put(assign_teacher))
        .route("/:id/students", get(list_students).post(enroll_students))
        .route("/:id/students/:student_id", delete(remove_student))
}

#[utoipa::path(
    post,
    path = "/classes",
    tag = "Classes",
    security(("bearer_auth" = [])),
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 403, description = "Owner only")
    )
)]
pub async fn create_class(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateClassRequest>,
) -> AppResult<Created<Class>> {
    let class = state
        .services
        .classes()
        .create_class(
            current_user.actor(),
            ClassInput {
                name: payload.name,
                grade_level: payload.grade_level,
                teacher_id: payload.teacher_id,
            },
        )
        .await?;
    Ok(Created(class))
}

/// Classes visible to the caller
#[utoipa::path(
    get,
    path = "/classes",
    tag = "Classes",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Classes", body = Vec<Class>))
)]
pub async fn list_classes(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Class>>> {
    let classes = state.services.classes().list_classes(current_user.actor()).await?;
    Ok(Json(classes))
}

#[utoipa::path(
    get,
    path = "/classes/{id}",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class", body = Class),
        (status = 404, description = "Class not found")
    )
)]
pub async fn get_class(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Class>> {
    let class = state.services.classes().get_class(current_user.actor(), id).await?;
    Ok(Json(class))
}

#[utoipa::path(
    put,
    path = "/classes/{id}",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 403, description = "Owner only")
    )
)]
pub async fn update_class(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateClassRequest>,
) -> AppResult<Json<Class>> {
    let class = state
        .services
        .classes()
        .update_class(
            current_user.actor(),
            id,
            ClassChanges {
                name: payload.name,
                grade_level: payload.grade_level,
            },
        )
        .await?;
    Ok(Json(class))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 403, description = "Owner only")
    )
)]
pub async fn delete_class(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.classes().delete_class(current_user.actor(), id).await?;
    Ok(NoContent)
}

#[utoipa::path(
    put,
    path = "/classes/{id}/teacher",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = AssignTeacherRequest,
    responses(
        (status = 200, description = "Teacher assigned", body = Class),
        (status = 400, description = "Not a teacher of this school")
    )
)]
pub async fn assign_teacher(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignTeacherRequest>,
) -> AppResult<Json<Class>> {
    let class = state
        .services
        .classes()
        .assign_teacher(current_user.actor(), id, payload.teacher_id)
        .await?;
    Ok(Json(class))
}

#[utoipa::path(
    get,
    path = "/classes/{id}/students",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    responses((status = 200, description = "Enrolled students", body = Vec<UserResponse>))
)]
pub async fn list_students(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let students = state.services.classes().list_students(current_user.actor(), id).await?;
    Ok(Json(students.into_iter().map(UserResponse::from).collect()))
}

/// Enroll students; already enrolled ones are ignored
#[utoipa::path(
    post,
    path = "/classes/{id}/students",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = EnrollStudentsRequest,
    responses(
        (status = 200, description = "Students enrolled", body = Vec<UserResponse>),
        (status = 400, description = "Unknown students")
    )
)]
pub async fn enroll_students(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<EnrollStudentsRequest>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let students = state
        .services
        .classes()
        .enroll_students(current_user.actor(), id, payload.student_ids)
        .await?;
    Ok(Json(students.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/classes/{id}/students/{student_id}",
    tag = "Classes",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Class ID"),
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 204, description = "Student removed"),
        (status = 404, description = "Student is not enrolled")
    )
)]
pub async fn remove_student(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> AppResult<NoContent> {
    state
        .services
        .classes()
        .remove_student(current_user.actor(), id, student_id)
        .await?;
    Ok(NoContent)
}
