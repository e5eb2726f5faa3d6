//! XP profile and class leaderboards.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{GamificationProfile, LeaderboardEntry};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u64>,
}

pub fn gamification_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_profile))
}

/// Routes nested under `/classes`
pub fn leaderboard_routes() -> Router<AppState> {
    Router::new().route("/:id/leaderboard", get(get_leaderboard))
}

#[utoipa::path(
    get,
    path = "/gamification/me",
    tag = "Gamification",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "XP, level, streak and achievements", body = GamificationProfile))
)]
pub async fn get_profile(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<GamificationProfile>> {
    let profile = state.services.gamification().profile(current_user.actor()).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/classes/{id}/leaderboard",
    tag = "Gamification",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Class ID"),
        ("limit" = Option<u64>, Query, description = "Number of entries, 10 by default")
    ),
    responses(
        (status = 200, description = "Students ranked by XP", body = Vec<LeaderboardEntry>),
        (status = 404, description = "Class not found")
    )
)]
pub async fn get_leaderboard(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let entries = state
        .services
        .gamification()
        .leaderboard(current_user.actor(), id, query.limit)
        .await?;
    Ok(Json(entries))
}
