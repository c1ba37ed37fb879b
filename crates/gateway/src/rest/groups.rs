//! Group, membership and group history REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use luminaras_database::{
    ChatError, CreateGroupMessageRequest, CreateGroupRequest, Group, GroupChatMessage,
    GroupMember, GroupWithMembers, Pagination,
};
use serde::Deserialize;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct PostGroupMessageRequest {
    pub content: String,
}

pub fn create_group_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/groups", post(create_group))
        .route("/api/groups/:group_id", get(get_group).delete(delete_group))
        .route(
            "/api/groups/:group_id/members",
            post(join_group).delete(leave_group),
        )
        .route(
            "/api/groups/:group_id/messages",
            get(list_group_messages).post(post_group_message),
        )
}

pub async fn create_group(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CreateGroupRequest>,
) -> GatewayResult<(StatusCode, Json<Group>)> {
    let group = state.groups.create(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    CurrentUser(_user_id): CurrentUser,
    Path(group_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<GroupWithMembers>> {
    Ok(Json(state.groups.find_with_members(group_id).await?))
}

/// Owner-only; members and history go with the group
pub async fn delete_group(
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<StatusCode> {
    state.groups.delete(group_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_group(
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<GroupMember>> {
    Ok(Json(state.groups.add_member(group_id, user_id).await?))
}

pub async fn leave_group(
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<StatusCode> {
    state.groups.remove_member(group_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_group_messages(
    CurrentUser(_user_id): CurrentUser,
    Path(group_id): Path<i64>,
    Query(page): Query<Pagination>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<GroupChatMessage>>> {
    ensure_group_exists(&state, group_id).await?;
    Ok(Json(state.group_messages.find_by_group(group_id, page).await?))
}

/// Post to a group outside the socket. Requires durable membership.
pub async fn post_group_message(
    CurrentUser(sender_id): CurrentUser,
    Path(group_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<PostGroupMessageRequest>,
) -> GatewayResult<(StatusCode, Json<GroupChatMessage>)> {
    ensure_group_exists(&state, group_id).await?;
    if !state.groups.is_member(group_id, sender_id).await? {
        return Err(ChatError::NotGroupMember.into());
    }
    if request.content.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "content must not be empty".to_string(),
        ));
    }

    let message = state
        .group_messages
        .create(&CreateGroupMessageRequest {
            group_id,
            sender_id,
            content: request.content,
        })
        .await?;

    let recipients = state.hub.forward_group(&message).await;
    info!(
        message_id = message.id,
        group_id,
        sender_id,
        recipients,
        "group message posted over REST"
    );

    Ok((StatusCode::CREATED, Json(message)))
}

async fn ensure_group_exists(state: &GatewayState, group_id: i64) -> GatewayResult<()> {
    match state.groups.find_by_id(group_id).await? {
        Some(_) => Ok(()),
        None => Err(ChatError::GroupNotFound.into()),
    }
}
