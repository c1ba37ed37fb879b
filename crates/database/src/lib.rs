//! Luminaras Database Crate
//!
//! Connection management, embedded migrations, and the repositories backing
//! direct messages, group chat, group membership, matches, user profiles and
//! achievements.

use luminaras_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{
    AchievementRepository, GroupMessageRepository, GroupRepository, MatchRepository,
    MessageRepository, UserRepository, POTENTIAL_MATCH_LIMIT,
};

pub use entities::{
    group::{CreateGroupRequest, Group, GroupMember, GroupWithMembers, MemberRole},
    matching::{Match, MatchStatus},
    message::{
        ChatMessage, ConversationSummary, CreateGroupMessageRequest, CreateMessageRequest,
        GroupChatMessage,
    },
    user::{Achievement, CreateAchievementRequest, CreateUserRequest, UpdateProfileRequest, User},
};

pub use types::{
    errors::{ChatError, DatabaseError},
    ChatResult, DatabaseResult, Pagination,
};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
