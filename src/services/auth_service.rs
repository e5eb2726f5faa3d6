//! School registration, login and token verification.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{NewSchool, NewUser, Password, School, User, UserResponse, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::with_transaction;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub school_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

/// Token response returned after successful authentication
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token expiration time in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Input of a school sign-up.
#[derive(Debug, Clone)]
pub struct SchoolRegistration {
    pub school_name: String,
    pub address: Option<String>,
    pub owner_name: String,
    pub email: String,
    pub password: String,
}

/// A freshly created school with its owner, already logged in.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredSchool {
    pub school: School,
    pub token: TokenResponse,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a school and its owner account atomically
    async fn register_school(&self, registration: SchoolRegistration) -> AppResult<RegisteredSchool>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_token(user: &User, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        school_id: user.school_id,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
        user: UserResponse::from(user.clone()),
    })
}

fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }
}

#[async_trait]
impl<U: UnitOfWork> AuthService for Authenticator<U> {
    async fn register_school(&self, registration: SchoolRegistration) -> AppResult<RegisteredSchool> {
        let school_name = registration.school_name.trim().to_string();
        if school_name.is_empty() {
            return Err(AppError::validation("School name is required"));
        }
        let email = normalize_email(&registration.email);
        let password_hash = Password::new(&registration.password)?.into_string();

        let school_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let new_school = NewSchool {
            id: school_id,
            name: school_name,
            address: registration.address,
            owner_id,
        };
        let new_owner = NewUser {
            id: owner_id,
            school_id,
            email,
            password_hash,
            name: registration.owner_name.trim().to_string(),
            role: UserRole::SchoolOwner,
        };

        let (school, owner) = with_transaction!(self.uow, |ctx| {
            // Soft-deleted accounts keep their email reserved
            if ctx
                .users()
                .find_by_email_with_deleted(&new_owner.email)
                .await?
                .is_some()
            {
                return Err(AppError::Conflict("User".to_string()));
            }
            let school = ctx.schools().create(new_school).await?;
            let owner = ctx.users().create(new_owner).await?;
            Ok((school, owner))
        })?;

        tracing::info!(school_id = %school.id, owner_id = %owner.id, "School registered");

        let token = generate_token(&owner, &self.config)?;
        Ok(RegisteredSchool { school, token })
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let email = normalize_email(&email);
        let user = self.uow.users().find_by_email(&email).await?;

        // Runs a full verification even for unknown emails
        let valid = Password::verify_or_dummy(user.as_ref().map(|u| u.password_hash.as_str()), &password);

        match user {
            Some(user) if valid => generate_token(&user, &self.config),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }
}
