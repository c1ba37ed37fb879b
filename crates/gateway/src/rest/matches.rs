//! Match REST endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use luminaras_database::{Match, MatchStatus, User, POTENTIAL_MATCH_LIMIT};
use serde::Deserialize;

use crate::error::GatewayResult;
use crate::middleware::CurrentUser;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RespondToMatchRequest {
    pub status: MatchStatus,
}

pub fn create_match_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/matches", get(list_matches).post(create_match))
        .route("/api/matches/potential", get(potential_matches))
        .route("/api/matches/:match_id", patch(respond_to_match))
}

pub async fn list_matches(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<Match>>> {
    Ok(Json(state.matches.list_for_user(user_id).await?))
}

/// Up to ten profiles the caller has no match with yet
pub async fn potential_matches(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<User>>> {
    Ok(Json(
        state
            .users
            .potential_matches(user_id, POTENTIAL_MATCH_LIMIT)
            .await?,
    ))
}

pub async fn create_match(
    CurrentUser(user_id): CurrentUser,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<CreateMatchRequest>,
) -> GatewayResult<(StatusCode, Json<Match>)> {
    let created = state.matches.create(user_id, request.user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn respond_to_match(
    CurrentUser(user_id): CurrentUser,
    Path(match_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<RespondToMatchRequest>,
) -> GatewayResult<Json<Match>> {
    let updated = state
        .matches
        .respond(match_id, user_id, request.status)
        .await?;
    Ok(Json(updated))
}
