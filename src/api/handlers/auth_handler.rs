//! School sign-up and login.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::errors::AppResult;
use crate::services::{RegisteredSchool, SchoolRegistration, TokenResponse};
use crate::types::Created;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterSchoolRequest {
    #[validate(length(min = 1, max = 200, message = "School name is required"))]
    #[schema(example = "Riverside Middle School")]
    pub school_name: String,
    #[schema(example = "12 River Road")]
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Owner name is required"))]
    #[schema(example = "Grace Hopper")]
    pub owner_name: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "owner@riverside.edu")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "owner@riverside.edu")]
    pub email: String,
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register-school", post(register_school))
        .route("/login", post(login))
}

/// Register a school together with its owner account
#[utoipa::path(
    post,
    path = "/auth/register-school",
    tag = "Authentication",
    request_body = RegisterSchoolRequest,
    responses(
        (status = 201, description = "School and owner created", body = RegisteredSchool),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register_school(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterSchoolRequest>,
) -> AppResult<Created<RegisteredSchool>> {
    let registered = state
        .services
        .auth()
        .register_school(SchoolRegistration {
            school_name: payload.school_name,
            address: payload.address,
            owner_name: payload.owner_name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Created(registered))
}

/// Login and get JWT token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = state
        .services
        .auth()
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(token))
}
