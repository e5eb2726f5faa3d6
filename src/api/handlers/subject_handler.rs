//! Subjects.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{Subject, SubjectChanges};
use crate::errors::AppResult;
use crate::services::SubjectInput;
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 100, message = "Subject name is required"))]
    #[schema(example = "Algebra")]
    pub name: String,
    /// Upper-cased before it is checked
    #[schema(example = "MATH-7")]
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 100, message = "Subject name cannot be empty"))]
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

pub fn subject_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/:id", get(get_subject).put(update_subject).delete(delete_subject))
}

#[utoipa::path(
    post,
    path = "/subjects",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Invalid subject code"),
        (status = 409, description = "Code already used in this school")
    )
)]
pub async fn create_subject(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSubjectRequest>,
) -> AppResult<Created<Subject>> {
    let subject = state
        .services
        .subjects()
        .create_subject(
            current_user.actor(),
            SubjectInput {
                name: payload.name,
                code: payload.code,
                description: payload.description,
            },
        )
        .await?;
    Ok(Created(subject))
}

#[utoipa::path(
    get,
    path = "/subjects",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Subjects of the school", body = Vec<Subject>))
)]
pub async fn list_subjects(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Subject>>> {
    let subjects = state.services.subjects().list_subjects(current_user.actor()).await?;
    Ok(Json(subjects))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_subject(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Subject>> {
    let subject = state.services.subjects().get_subject(current_user.actor(), id).await?;
    Ok(Json(subject))
}

#[utoipa::path(
    put,
    path = "/subjects/{id}",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 409, description = "Code already used in this school")
    )
)]
pub async fn update_subject(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateSubjectRequest>,
) -> AppResult<Json<Subject>> {
    let subject = state
        .services
        .subjects()
        .update_subject(
            current_user.actor(),
            id,
            SubjectChanges {
                name: payload.name,
                code: payload.code,
                description: payload.description,
            },
        )
        .await?;
    Ok(Json(subject))
}

#[utoipa::path(
    delete,
    path = "/subjects/{id}",
    tag = "Subjects",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn delete_subject(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.subjects().delete_subject(current_user.actor(), id).await?;
    Ok(NoContent)
}
