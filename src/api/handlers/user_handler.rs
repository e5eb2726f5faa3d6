//! School members.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{UserResponse, UserRole};
use crate::errors::AppResult;
use crate::services::NewMember;
use crate::types::{Created, NoContent, Paginated, PaginationMeta, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "teacher@riverside.edu")]
    pub email: String,
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    #[schema(example = "Ada King")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub role: Option<UserRole>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// One page of members.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberPage {
    pub data: Vec<UserResponse>,
    pub meta: PaginationMeta,
}

impl From<Paginated<UserResponse>> for MemberPage {
    fn from(page: Paginated<UserResponse>) -> Self {
        Self {
            data: page.data,
            meta: page.meta,
        }
    }
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_members).post(create_member))
        .route("/me", get(get_current_user))
        .route("/:id", get(get_member).put(update_member).delete(delete_member))
        .route("/:id/restore", post(restore_member))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users().me(current_user.actor()).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Create a teacher (owner) or a student (owner or teacher)
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateMemberRequest,
    responses(
        (status = 201, description = "Member created", body = UserResponse),
        (status = 403, description = "Role may not create this kind of member"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_member(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMemberRequest>,
) -> AppResult<Created<UserResponse>> {
    let user = state
        .services
        .users()
        .create_member(
            current_user.actor(),
            NewMember {
                email: payload.email,
                name: payload.name,
                password: payload.password,
                role: payload.role,
            },
        )
        .await?;

    Ok(Created(UserResponse::from(user)))
}

/// List members of the school (staff only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("role" = Option<UserRole>, Query, description = "Only members with this role"),
        ("page" = Option<u64>, Query, description = "Page number, starting at 1"),
        ("per_page" = Option<u64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "One page of members", body = MemberPage),
        (status = 403, description = "Students may not list members")
    )
)]
pub async fn list_members(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<MemberPage>> {
    let params = PaginationParams::new(query.page, query.per_page);
    let (users, total) = state
        .services
        .users()
        .list_members(current_user.actor(), query.role, params)
        .await?;

    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(Paginated::new(data, params, total).into()))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Member profile", body = UserResponse),
        (status = 404, description = "No such member in this school")
    )
)]
pub async fn get_member(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users().get_member(current_user.actor(), id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Rename a member (self, or someone the caller manages)
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = UserResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No such member in this school")
    )
)]
pub async fn update_member(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateMemberRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .users()
        .update_member(current_user.actor(), id, payload.name)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Soft delete a member
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No such member in this school")
    )
)]
pub async fn delete_member(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.users().delete_member(current_user.actor(), id).await?;
    Ok(NoContent)
}

#[utoipa::path(
    post,
    path = "/users/{id}/restore",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Member restored", body = UserResponse),
        (status = 400, description = "Member is not deleted"),
        (status = 404, description = "No such member in this school")
    )
)]
pub async fn restore_member(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.services.users().restore_member(current_user.actor(), id).await?;
    Ok(Json(UserResponse::from(user)))
}
