//! Database repository implementations

pub mod achievement_repository;
pub mod group_message_repository;
pub mod group_repository;
pub mod match_repository;
pub mod message_repository;
pub mod user_repository;

pub use achievement_repository::*;
pub use group_message_repository::*;
pub use group_repository::*;
pub use match_repository::*;
pub use message_repository::*;
pub use user_repository::*;
