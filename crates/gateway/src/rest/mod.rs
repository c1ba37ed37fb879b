//! REST API endpoints for the gateway

pub mod achievements;
pub mod groups;
pub mod health;
pub mod matches;
pub mod message;
pub mod news;
pub mod users;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::GatewayState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(message::create_message_routes())
        .merge(matches::create_match_routes())
        .merge(groups::create_group_routes())
        .merge(users::create_user_routes())
        .merge(achievements::create_achievement_routes())
        .route("/api/news", get(news::list_news))
}
