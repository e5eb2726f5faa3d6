//! Analytics reports, cached per school until the next attempt.
//!
//! Role checks run before the cache lookup; a cached report is only ever
//! stored under the school of the caller that computed it.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{PathAnalytics, SchoolOverview, TeacherDashboard, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::Cache;

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/school", get(school_overview))
        .route("/teachers/:id", get(teacher_dashboard))
        .route("/subjects/:id", get(path_analytics))
}

#[utoipa::path(
    get,
    path = "/analytics/school",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "School-wide overview", body = SchoolOverview),
        (status = 403, description = "Owner only")
    )
)]
pub async fn school_overview(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<SchoolOverview>> {
    let actor = current_user.actor();
    actor.require_any(&[UserRole::SchoolOwner])?;
    let key = Cache::analytics_key(actor.school_id, "school");
    let analytics = state.services.analytics();
    let overview = state.cached(key, analytics.school_overview(actor)).await?;
    Ok(Json(overview))
}

#[utoipa::path(
    get,
    path = "/analytics/teachers/{id}",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Classes and students of a teacher", body = TeacherDashboard),
        (status = 403, description = "Only the teacher or the owner")
    )
)]
pub async fn teacher_dashboard(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TeacherDashboard>> {
    let actor = current_user.actor();
    if !(actor.is_owner() || (actor.is_teacher() && actor.id == id)) {
        return Err(AppError::Forbidden);
    }
    let key = Cache::analytics_key(actor.school_id, &format!("teacher:{}", id));
    let analytics = state.services.analytics();
    let dashboard = state.cached(key, analytics.teacher_dashboard(actor, id)).await?;
    Ok(Json(dashboard))
}

#[utoipa::path(
    get,
    path = "/analytics/subjects/{id}",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Completion and bottlenecks per node", body = PathAnalytics),
        (status = 403, description = "Staff only")
    )
)]
pub async fn path_analytics(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PathAnalytics>> {
    let actor = current_user.actor();
    actor.require_staff()?;
    let key = Cache::analytics_key(actor.school_id, &format!("subject:{}", id));
    let analytics = state.services.analytics();
    let report = state.cached(key, analytics.path_analytics(actor, id)).await?;
    Ok(Json(report))
}
