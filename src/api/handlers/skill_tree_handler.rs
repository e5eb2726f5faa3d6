//! Skill nodes and the trees they form.

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
use crate::domain::{SkillNode, SkillNodeChanges, StudentTreeNode, TreeNode};
use crate::errors::AppResult;
use crate::services::{CalibrationReport, NodeInput};
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateNodeRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    #[schema(example = "Linear equations")]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5"))]
    #[schema(example = 2)]
    pub difficulty: i32,
    #[validate(range(min = 0, message = "XP reward cannot be negative"))]
    #[schema(example = 40)]
    pub xp_reward: i32,
    #[serde(default)]
    pub position: i32,
    /// Nodes of the same subject that must be completed first
    #[serde(default)]
    pub prerequisites: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateNodeRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Difficulty must be between 1 and 5"))]
    pub difficulty: Option<i32>,
    #[validate(range(min = 0, message = "XP reward cannot be negative"))]
    pub xp_reward: Option<i32>,
    pub position: Option<i32>,
    /// Replaces the whole prerequisite set when present
    pub prerequisites: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CalibrateRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// Routes nested under `/subjects`
pub fn subject_tree_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/tree", get(get_tree))
        .route("/:id/nodes", post(create_node))
        .route("/:id/calibrate", post(calibrate_subject))
        .route("/:id/students/:student_id/tree", get(get_student_tree))
}

/// Routes nested under `/nodes`
pub fn node_routes() -> Router<AppState> {
    Router::new().route("/:id", get(get_node).put(update_node).delete(delete_node))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}/tree",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Nodes in prerequisite order", body = Vec<TreeNode>),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_tree(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<TreeNode>>> {
    let tree = state.services.skill_tree().get_tree(current_user.actor(), id).await?;
    Ok(Json(tree))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}/students/{student_id}/tree",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Subject ID"),
        ("student_id" = Uuid, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Tree with the student's status per node", body = Vec<StudentTreeNode>),
        (status = 404, description = "Subject or student not found")
    )
)]
pub async fn get_student_tree(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, student_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<StudentTreeNode>>> {
    let tree = state
        .services
        .skill_tree()
        .get_student_tree(current_user.actor(), id, student_id)
        .await?;
    Ok(Json(tree))
}

#[utoipa::path(
    post,
    path = "/subjects/{id}/nodes",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = CreateNodeRequest,
    responses(
        (status = 201, description = "Node created", body = SkillNode),
        (status = 400, description = "Unknown prerequisite or cycle"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn create_node(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateNodeRequest>,
) -> AppResult<Created<SkillNode>> {
    let node = state
        .services
        .skill_tree()
        .create_node(
            current_user.actor(),
            id,
            NodeInput {
                title: payload.title,
                description: payload.description,
                difficulty: payload.difficulty,
                xp_reward: payload.xp_reward,
                position: payload.position,
                prerequisites: payload.prerequisites,
            },
        )
        .await?;
    Ok(Created(node))
}

/// Recompute node difficulty from observed pass rates
#[utoipa::path(
    post,
    path = "/subjects/{id}/calibrate",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    request_body = CalibrateRequest,
    responses(
        (status = 200, description = "Adjustments made or proposed", body = CalibrationReport),
        (status = 403, description = "Staff only")
    )
)]
pub async fn calibrate_subject(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CalibrateRequest>>,
) -> AppResult<Json<CalibrationReport>> {
    let Json(request) = payload.unwrap_or_default();
    let report = state
        .services
        .skill_tree()
        .calibrate_subject(current_user.actor(), id, request.dry_run)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/nodes/{id}",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Skill node ID")),
    responses(
        (status = 200, description = "Skill node", body = SkillNode),
        (status = 404, description = "Node not found")
    )
)]
pub async fn get_node(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SkillNode>> {
    let node = state.services.skill_tree().get_node(current_user.actor(), id).await?;
    Ok(Json(node))
}

#[utoipa::path(
    put,
    path = "/nodes/{id}",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Skill node ID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Node updated", body = SkillNode),
        (status = 400, description = "Unknown prerequisite or cycle"),
        (status = 404, description = "Node not found")
    )
)]
pub async fn update_node(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateNodeRequest>,
) -> AppResult<Json<SkillNode>> {
    let node = state
        .services
        .skill_tree()
        .update_node(
            current_user.actor(),
            id,
            SkillNodeChanges {
                title: payload.title,
                description: payload.description.map(Some),
                difficulty: payload.difficulty,
                xp_reward: payload.xp_reward,
                position: payload.position,
                prerequisites: payload.prerequisites,
            },
        )
        .await?;
    Ok(Json(node))
}

#[utoipa::path(
    delete,
    path = "/nodes/{id}",
    tag = "Skill tree",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Skill node ID")),
    responses(
        (status = 204, description = "Node deleted"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn delete_node(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.skill_tree().delete_node(current_user.actor(), id).await?;
    Ok(NoContent)
}
