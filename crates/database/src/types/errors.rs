//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Messaging, group and match errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Group not found")]
    GroupNotFound,

    #[error("Match not found")]
    MatchNotFound,

    #[error("Member not found")]
    MemberNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Match already exists")]
    MatchAlreadyExists,

    #[error("Users do not share an accepted match")]
    NotMatched,

    #[error("User is not a member of this group")]
    NotGroupMember,

    #[error("Sender and receiver must be different users")]
    SelfMessage,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ChatError {
    fn from(error: sqlx::Error) -> Self {
        ChatError::DatabaseError(error.to_string())
    }
}
