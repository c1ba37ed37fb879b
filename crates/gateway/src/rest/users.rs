//! Profile REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use luminaras_database::{ChatError, CreateUserRequest, UpdateProfileRequest, User};

use crate::error::GatewayResult;
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

pub fn create_user_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:user_id", get(get_user).patch(update_user))
}

pub async fn create_user(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CreateUserRequest>,
) -> GatewayResult<(StatusCode, Json<User>)> {
    let user = state.users.create(&request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<User>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ChatError::UserNotFound)?;
    Ok(Json(user))
}

/// Users may only edit their own profile
pub async fn update_user(
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<UpdateProfileRequest>,
) -> GatewayResult<Json<User>> {
    if caller != user_id {
        return Err(ChatError::Unauthorized.into());
    }
    Ok(Json(state.users.update_profile(user_id, &request).await?))
}
