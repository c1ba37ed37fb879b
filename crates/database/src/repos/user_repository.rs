//! Repository for user profiles and match suggestions.

use crate::entities::{CreateUserRequest, UpdateProfileRequest, User};
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// How many profiles one potential-match query returns
pub const POTENTIAL_MATCH_LIMIT: i64 = 10;

const USER_COLUMNS: &str = "id, username, display_name, avatar, background, bio, gamer_type, \
                            gaming_level, is_content_creator, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateUserRequest) -> ChatResult<User> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(ChatError::InvalidInput("username must not be empty".to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO users (username, display_name, is_content_creator, created_at)
             VALUES (?, ?, 0, ?)",
        )
        .bind(username)
        .bind(&request.display_name)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => ChatError::UsernameTaken,
            other => other.into(),
        })?;

        let user_id = result.last_insert_rowid();
        info!(user_id, username, "created user");

        Ok(User {
            id: user_id,
            username: username.to_string(),
            display_name: request.display_name.clone(),
            avatar: None,
            background: None,
            bio: None,
            gamer_type: None,
            gaming_level: None,
            is_content_creator: false,
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, user_id: i64) -> ChatResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> ChatResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        request: &UpdateProfileRequest,
    ) -> ChatResult<User> {
        let result = sqlx::query(
            "UPDATE users
             SET display_name = COALESCE(?, display_name),
                 avatar = COALESCE(?, avatar),
                 background = COALESCE(?, background),
                 bio = COALESCE(?, bio),
                 gamer_type = COALESCE(?, gamer_type),
                 gaming_level = COALESCE(?, gaming_level),
                 is_content_creator = COALESCE(?, is_content_creator)
             WHERE id = ?",
        )
        .bind(&request.display_name)
        .bind(&request.avatar)
        .bind(&request.background)
        .bind(&request.bio)
        .bind(&request.gamer_type)
        .bind(&request.gaming_level)
        .bind(request.is_content_creator)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::UserNotFound);
        }

        info!(user_id, "profile updated");
        self.find_by_id(user_id).await?.ok_or(ChatError::UserNotFound)
    }

    /// Profiles `user_id` could swipe on: everyone except themselves and
    /// anyone they already share a match with, in either direction.
    pub async fn potential_matches(&self, user_id: i64, limit: i64) -> ChatResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             WHERE u.id <> ?
               AND NOT EXISTS (
                   SELECT 1 FROM matches m
                   WHERE (m.user_id_1 = ? AND m.user_id_2 = u.id)
                      OR (m.user_id_2 = ? AND m.user_id_1 = u.id)
               )
             ORDER BY u.id ASC
             LIMIT ?"
        ))
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_user).collect()
    }

    pub async fn count(&self) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_user(row: &SqliteRow) -> ChatResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        avatar: row.try_get("avatar")?,
        background: row.try_get("background")?,
        bio: row.try_get("bio")?,
        gamer_type: row.try_get("gamer_type")?,
        gaming_level: row.try_get("gaming_level")?,
        is_content_creator: row.try_get("is_content_creator")?,
        created_at: row.try_get("created_at")?,
    })
}
