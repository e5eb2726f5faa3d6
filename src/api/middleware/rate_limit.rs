//! Fixed-window rate limiting backed by Redis.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use super::auth::CurrentUser;
use crate::api::AppState;
use crate::config::{
    RATE_LIMIT_AUTH_REQUESTS, RATE_LIMIT_AUTH_WINDOW_SECONDS, RATE_LIMIT_REQUESTS,
    RATE_LIMIT_WINDOW_SECONDS,
};

#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from(self.retry_after));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));

        (
            StatusCode::TOO_MANY_REQUESTS,
            headers,
            "Too many requests. Please try again later.",
        )
            .into_response()
    }
}

/// Limits for one group of routes.
#[derive(Debug, Clone, Copy)]
struct Window {
    scope: &'static str,
    max_requests: u64,
    seconds: u64,
}

const GENERAL: Window = Window {
    scope: "general",
    max_requests: RATE_LIMIT_REQUESTS,
    seconds: RATE_LIMIT_WINDOW_SECONDS,
};

const AUTH: Window = Window {
    scope: "auth",
    max_requests: RATE_LIMIT_AUTH_REQUESTS,
    seconds: RATE_LIMIT_AUTH_WINDOW_SECONDS,
};

/// Client address: first X-Forwarded-For hop, then X-Real-IP, then the
/// socket peer.
fn client_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

    if let Some(ip) = header("X-Forwarded-For")
        .and_then(|f| f.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }
    if let Some(ip) = header("X-Real-IP") {
        return ip.trim().to_string();
    }
    peer.map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Authenticated requests count against the user, everything else against
/// the client address.
fn rate_limit_subject(user: Option<&CurrentUser>, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    match user {
        Some(user) => format!("user:{}", user.id),
        None => format!("ip:{}", client_identifier(headers, peer)),
    }
}

async fn enforce(
    state: &AppState,
    window: Window,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let client = rate_limit_subject(request.extensions().get::<CurrentUser>(), request.headers(), peer);
    let key = format!("{}:{}", window.scope, client);

    let (count, allowed) = match state
        .cache
        .check_rate_limit(&key, window.max_requests, window.seconds)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            // Fail closed when Redis is unavailable
            tracing::error!(error = %e, scope = window.scope, "Rate limit check failed");
            return Err(RateLimitError {
                retry_after: window.seconds,
            });
        }
    };

    if !allowed {
        tracing::warn!(client = %client, count, scope = window.scope, "Rate limit exceeded");
        return Err(RateLimitError {
            retry_after: window.seconds,
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(window.max_requests));
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from(window.max_requests.saturating_sub(count)),
    );

    Ok(response)
}

/// Runs after [`super::auth_middleware`] on protected routes so the
/// authenticated user is known.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, GENERAL, request, next).await
}

/// Stricter limit for login and registration.
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    enforce(&state, AUTH, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_429_with_retry_after() {
        let response = RateLimitError { retry_after: 60 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "60");
    }

    #[test]
    fn forwarded_header_wins_over_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        assert_eq!(client_identifier(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(client_identifier(&HeaderMap::new(), Some(peer)), "127.0.0.1");
        assert_eq!(client_identifier(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn authenticated_requests_are_limited_per_user() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7"));
        let user = CurrentUser {
            id: uuid::Uuid::new_v4(),
            email: "mia@school.edu".to_string(),
            role: crate::domain::UserRole::Student,
            school_id: uuid::Uuid::new_v4(),
        };

        // Two users behind one school NAT get separate budgets
        let other = CurrentUser {
            id: uuid::Uuid::new_v4(),
            ..user.clone()
        };
        let first = rate_limit_subject(Some(&user), &headers, None);
        assert_eq!(first, format!("user:{}", user.id));
        assert_ne!(first, rate_limit_subject(Some(&other), &headers, None));

        assert_eq!(rate_limit_subject(None, &headers, None), "ip:203.0.113.7");
    }

    #[test]
    fn auth_window_is_stricter() {
        assert!(AUTH.max_requests < GENERAL.max_requests);
    }
}
