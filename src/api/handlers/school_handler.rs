//! The caller's school.

use axum::{
    extract::{Extension, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{School, SchoolChanges};
use crate::errors::AppResult;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSchoolRequest {
    #[validate(length(min = 1, max = 200, message = "School name cannot be empty"))]
    pub name: Option<String>,
    pub address: Option<String>,
}

pub fn school_routes() -> Router<AppState> {
    Router::new().route("/", get(get_school).put(update_school))
}

#[utoipa::path(
    get,
    path = "/school",
    tag = "School",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "The caller's school", body = School))
)]
pub async fn get_school(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<School>> {
    let school = state.services.schools().get_school(current_user.actor()).await?;
    Ok(Json(school))
}

#[utoipa::path(
    put,
    path = "/school",
    tag = "School",
    security(("bearer_auth" = [])),
    request_body = UpdateSchoolRequest,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 403, description = "Owner only")
    )
)]
pub async fn update_school(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<UpdateSchoolRequest>,
) -> AppResult<Json<School>> {
    let school = state
        .services
        .schools()
        .update_school(
            current_user.actor(),
            SchoolChanges {
                name: payload.name,
                address: payload.address,
            },
        )
        .await?;
    Ok(Json(school))
}
