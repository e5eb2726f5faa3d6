//! Tutor chat. The reply comes from the chat service; history is a capped
//! Redis list per user in the session cache.

use axum::{
    extract::{Extension, State},
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
use crate::config::CHAT_HISTORY_LIMIT;
use crate::domain::ChatExchange;
use crate::errors::AppResult;
use crate::services::history_key;
use crate::types::NoContent;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1 to 2000 characters"))]
    #[schema(example = "How do I isolate x?")]
    pub message: String,
    pub subject_id: Option<Uuid>,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/history", get(get_history).delete(clear_history))
}

#[utoipa::path(
    post,
    path = "/chat/messages",
    tag = "Chat",
    security(("bearer_auth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Tutor reply", body = ChatExchange),
        (status = 400, description = "Empty or oversized message")
    )
)]
pub async fn send_message(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SendMessageRequest>,
) -> AppResult<Json<ChatExchange>> {
    let exchange = state
        .services
        .chat()
        .send_message(current_user.actor(), payload.message, payload.subject_id)
        .await?;

    if let Err(e) = state
        .cache
        .push_session_entry(
            &history_key(current_user.id),
            &exchange,
            CHAT_HISTORY_LIMIT,
            state.chat_history_ttl,
        )
        .await
    {
        tracing::warn!(user_id = %current_user.id, error = %e, "Failed to store chat history");
    }

    Ok(Json(exchange))
}

/// Recent exchanges, oldest first
#[utoipa::path(
    get,
    path = "/chat/history",
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Chat history", body = Vec<ChatExchange>))
)]
pub async fn get_history(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ChatExchange>>> {
    let history = state
        .cache
        .get_session_entries::<ChatExchange>(&history_key(current_user.id))
        .await?;
    Ok(Json(history))
}

#[utoipa::path(
    delete,
    path = "/chat/history",
    tag = "Chat",
    security(("bearer_auth" = [])),
    responses((status = 204, description = "History cleared"))
)]
pub async fn clear_history(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<NoContent> {
    state.cache.delete_session(&history_key(current_user.id)).await?;
    Ok(NoContent)
}
