//! Achievement REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use luminaras_database::{Achievement, CreateAchievementRequest};

use crate::error::GatewayResult;
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

pub fn create_achievement_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/achievements", post(create_achievement))
        .route("/api/achievements/:user_id", get(list_achievements))
}

/// Record an achievement on the caller's own profile
pub async fn create_achievement(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CreateAchievementRequest>,
) -> GatewayResult<(StatusCode, Json<Achievement>)> {
    let achievement = state.achievements.create(user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(achievement)))
}

pub async fn list_achievements(
    Path(user_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<Achievement>>> {
    Ok(Json(state.achievements.list_for_user(user_id).await?))
}
