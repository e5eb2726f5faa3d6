//! Attempts on skill nodes and student progress.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::SubjectProgress;
use crate::errors::AppResult;
use crate::services::{AttemptInput, AttemptOutcome, SubjectProgressReport};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptRequest {
    #[validate(range(min = 0, message = "Correct answers cannot be negative"))]
    #[schema(example = 8)]
    pub correct: i32,
    #[validate(range(min = 1, message = "An attempt needs at least one question"))]
    #[schema(example = 10)]
    pub total: i32,
    #[validate(range(min = 0, message = "Time spent cannot be negative"))]
    #[serde(default)]
    #[schema(example = 12)]
    pub time_spent_minutes: i32,
}

/// Routes nested under `/nodes`
pub fn attempt_routes() -> Router<AppState> {
    Router::new().route("/:id/attempts", post(submit_attempt))
}

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/students/:id", get(all_progress))
        .route("/students/:id/subjects/:subject_id", get(subject_progress))
}

/// Submit a graded attempt as the signed-in student
#[utoipa::path(
    post,
    path = "/nodes/{id}/attempts",
    tag = "Progress",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Skill node ID")),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Attempt graded", body = AttemptOutcome),
        (status = 400, description = "Invalid attempt or prerequisites not completed"),
        (status = 403, description = "Students only")
    )
)]
pub async fn submit_attempt(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SubmitAttemptRequest>,
) -> AppResult<Json<AttemptOutcome>> {
    let outcome = state
        .services
        .progress()
        .submit_attempt(
            current_user.actor(),
            id,
            AttemptInput {
                correct: payload.correct,
                total: payload.total,
                time_spent_minutes: payload.time_spent_minutes,
            },
        )
        .await?;

    if let Err(e) = state.cache.invalidate_analytics(outcome.school_id).await {
        tracing::warn!(school_id = %outcome.school_id, error = %e, "Failed to invalidate analytics cache");
    }

    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/progress/students/{id}",
    tag = "Progress",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Progress in every started subject", body = Vec<SubjectProgress>),
        (status = 404, description = "Student not found")
    )
)]
pub async fn all_progress(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<SubjectProgress>>> {
    let progress = state.services.progress().all_progress(current_user.actor(), id).await?;
    Ok(Json(progress))
}

#[utoipa::path(
    get,
    path = "/progress/students/{id}/subjects/{subject_id}",
    tag = "Progress",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Student ID"),
        ("subject_id" = Uuid, Path, description = "Subject ID")
    ),
    responses(
        (status = 200, description = "Progress in one subject", body = SubjectProgressReport),
        (status = 404, description = "Student or subject not found")
    )
)]
pub async fn subject_progress(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, subject_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<SubjectProgressReport>> {
    let report = state
        .services
        .progress()
        .subject_progress(current_user.actor(), id, subject_id)
        .await?;
    Ok(Json(report))
}
