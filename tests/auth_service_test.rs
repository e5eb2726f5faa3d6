//! Login, token and error response tests.

mod common;

use axum::{http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use common::{user, Mocks};
use learnpath::domain::{Password, School, User, UserRole};
use learnpath::errors::AppError;
use learnpath::services::{AuthService, Authenticator, SchoolRegistration};
use learnpath::Config;

const SECRET: &str = "integration-secret-at-least-32-characters";

fn authenticator(mocks: Mocks) -> Authenticator<common::TestUnitOfWork> {
    Authenticator::new(mocks.build(), Config::with_secret(SECRET))
}

#[tokio::test]
async fn login_issues_token_with_school_and_role() {
    let school_id = Uuid::new_v4();
    let teacher_id = Uuid::new_v4();
    let hash = Password::new("SecurePass123!").unwrap().into_string();

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_email()
        .withf(|email| email == "tom@school.edu")
        .returning(move |_| {
            let mut teacher = user(teacher_id, school_id, UserRole::Teacher, "Tom");
            teacher.password_hash = hash.clone();
            Ok(Some(teacher))
        });

    let auth = authenticator(mocks);
    let token = auth
        .login(" Tom@School.EDU ".to_string(), "SecurePass123!".to_string())
        .await
        .unwrap();
    let claims = auth.verify_token(&token.access_token).unwrap();

    assert_eq!(claims.sub, teacher_id);
    assert_eq!(claims.school_id, school_id);
    assert_eq!(claims.role, UserRole::Teacher);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let hash = Password::new("SecurePass123!").unwrap().into_string();

    let mut mocks = Mocks::default();
    mocks.users.expect_find_by_email().returning(move |_| {
        let mut student = user(Uuid::new_v4(), Uuid::new_v4(), UserRole::Student, "Mia");
        student.password_hash = hash.clone();
        Ok(Some(student))
    });

    let result = authenticator(mocks)
        .login("mia@school.edu".to_string(), "WrongPass123!".to_string())
        .await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn unknown_email_is_invalid_credentials() {
    let mut mocks = Mocks::default();
    mocks.users.expect_find_by_email().returning(|_| Ok(None));

    let result = authenticator(mocks)
        .login("ghost@school.edu".to_string(), "SecurePass123!".to_string())
        .await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));
}

fn registration(school_name: &str) -> SchoolRegistration {
    SchoolRegistration {
        school_name: school_name.to_string(),
        address: Some("1 River Road".to_string()),
        owner_name: " Ada Park ".to_string(),
        email: "Ada@Riverside.EDU".to_string(),
        password: "SecurePass123!".to_string(),
    }
}

#[tokio::test]
async fn registration_creates_school_and_logs_owner_in() {
    let mut mocks = Mocks::default();
    mocks
        .tx_users
        .expect_find_by_email_with_deleted()
        .withf(|email| email == "ada@riverside.edu")
        .times(1)
        .returning(|_| Ok(None));
    mocks
        .tx_schools
        .expect_create()
        .withf(|new| new.name == "Riverside High")
        .times(1)
        .returning(|new| {
            Ok(School {
                id: new.id,
                name: new.name,
                address: new.address,
                owner_id: new.owner_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        });
    mocks
        .tx_users
        .expect_create()
        .withf(|new| new.role == UserRole::SchoolOwner && new.name == "Ada Park")
        .times(1)
        .returning(|new| {
            Ok(User {
                email: new.email,
                password_hash: new.password_hash,
                ..user(new.id, new.school_id, new.role, &new.name)
            })
        });

    let auth = authenticator(mocks);
    let registered = auth.register_school(registration(" Riverside High ")).await.unwrap();
    let claims = auth.verify_token(&registered.token.access_token).unwrap();

    assert_eq!(registered.school.name, "Riverside High");
    assert_eq!(claims.sub, registered.school.owner_id);
    assert_eq!(claims.school_id, registered.school.id);
    assert_eq!(claims.role, UserRole::SchoolOwner);
    assert_eq!(claims.email, "ada@riverside.edu");
}

#[tokio::test]
async fn deleted_accounts_keep_their_email_reserved() {
    let mut mocks = Mocks::default();
    mocks
        .tx_users
        .expect_find_by_email_with_deleted()
        .returning(|_| {
            let mut former = user(Uuid::new_v4(), Uuid::new_v4(), UserRole::Teacher, "Ada");
            former.deleted_at = Some(Utc::now());
            Ok(Some(former))
        });
    mocks.tx_schools.expect_create().never();
    mocks.tx_users.expect_create().never();

    let result = authenticator(mocks)
        .register_school(registration("Riverside High"))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn school_needs_a_name() {
    let mut mocks = Mocks::default();
    mocks.tx_users.expect_find_by_email_with_deleted().never();
    mocks.tx_schools.expect_create().never();

    let result = authenticator(mocks).register_school(registration("   ")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn tampered_token_is_rejected() {
    let auth = authenticator(Mocks::default());
    assert!(auth.verify_token("not.a.token").is_err());
}

#[test]
fn errors_map_to_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        (AppError::Forbidden, StatusCode::FORBIDDEN),
        (AppError::NotFound, StatusCode::NOT_FOUND),
        (AppError::conflict("Subject code"), StatusCode::CONFLICT),
        (AppError::validation("bad"), StatusCode::BAD_REQUEST),
        (AppError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (error, status) in cases {
        assert_eq!(error.into_response().status(), status);
    }
}

#[tokio::test]
async fn internal_errors_hide_details() {
    let response = AppError::internal("connection string leaked").into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"]["message"], "An internal error occurred");
}
