//! Direct message REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use luminaras_database::{
    ChatError, ChatMessage, ConversationSummary, CreateMessageRequest, Pagination,
};
use serde::Deserialize;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

const CONVERSATION_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: String,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/messages/conversations", get(list_conversations))
        .route("/api/messages/:peer_id", get(list_history))
}

/// Peers the caller has exchanged messages with, most recent first
pub async fn list_conversations(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<ConversationSummary>>> {
    let conversations = state
        .messages
        .find_conversations(user_id, CONVERSATION_LIMIT)
        .await?;
    Ok(Json(conversations))
}

pub async fn list_history(
    CurrentUser(user_id): CurrentUser,
    Path(peer_id): Path<i64>,
    Query(page): Query<Pagination>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<ChatMessage>>> {
    let messages = state
        .messages
        .find_conversation(user_id, peer_id, page)
        .await?;
    Ok(Json(messages))
}

/// Send a direct message outside the socket. Only matched users may talk.
pub async fn send_message(
    CurrentUser(sender_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<SendMessageRequest>,
) -> GatewayResult<(StatusCode, Json<ChatMessage>)> {
    if request.receiver_id == sender_id {
        return Err(ChatError::SelfMessage.into());
    }
    if request.content.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "content must not be empty".to_string(),
        ));
    }
    if !state
        .matches
        .are_matched(sender_id, request.receiver_id)
        .await?
    {
        return Err(ChatError::NotMatched.into());
    }

    let message = state
        .messages
        .create(&CreateMessageRequest {
            sender_id,
            receiver_id: request.receiver_id,
            content: request.content,
        })
        .await?;

    let recipients = state.hub.forward_direct(&message).await;
    info!(
        message_id = message.id,
        sender_id,
        recipients,
        "direct message sent over REST"
    );

    Ok((StatusCode::CREATED, Json(message)))
}
