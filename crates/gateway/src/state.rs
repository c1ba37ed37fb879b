//! Shared application state for the gateway

use std::sync::Arc;

use luminaras_config::RealtimeConfig;
use luminaras_database::{
    AchievementRepository, GroupMessageRepository, GroupRepository, MatchRepository,
    MessageRepository, UserRepository,
};
use sqlx::SqlitePool;

use crate::websocket::{MessageStore, RealtimeHub, SqliteMessageStore};

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    /// Database connection pool
    pub pool: SqlitePool,
    pub realtime: RealtimeConfig,
    pub messages: MessageRepository,
    pub group_messages: GroupMessageRepository,
    pub groups: GroupRepository,
    pub matches: MatchRepository,
    pub users: UserRepository,
    pub achievements: AchievementRepository,
    /// Live connections and group presence
    pub hub: RealtimeHub,
}

impl GatewayState {
    /// Create a gateway state whose socket relays persist to `pool`
    pub fn new(pool: SqlitePool, realtime: RealtimeConfig) -> Self {
        let store = Arc::new(SqliteMessageStore::new(pool.clone()));
        Self::with_store(pool, realtime, store)
    }

    /// Create a gateway state with a custom relay store
    pub fn with_store(
        pool: SqlitePool,
        realtime: RealtimeConfig,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            group_messages: GroupMessageRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            matches: MatchRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            achievements: AchievementRepository::new(pool.clone()),
            hub: RealtimeHub::new(store),
            realtime,
            pool,
        }
    }
}
