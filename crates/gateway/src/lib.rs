//! # Luminaras Gateway Crate
//!
//! HTTP and WebSocket surface of the Luminaras backend.
//!
//! - **WebSocket**: direct and group chat relays over `/ws` and `/ws/groups/:id`
//! - **REST**: message history, matches, groups, profiles and achievements
//! - **State**: repositories plus the realtime hub, shared by both
//!
//! ## Usage
//!
//! ```rust,no_run
//! use luminaras_config::RealtimeConfig;
//! use luminaras_gateway::{create_router, GatewayState};
//!
//! # async fn serve(pool: sqlx::SqlitePool) -> anyhow::Result<()> {
//! let state = GatewayState::new(pool, RealtimeConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;
pub use websocket::RealtimeHub;

use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);
    Router::new()
        .merge(rest::create_rest_routes().with_state(arc_state.clone()))
        .merge(websocket::create_websocket_routes().with_state(arc_state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                ])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
}
