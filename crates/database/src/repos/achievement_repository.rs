//! Repository for profile achievements.

use crate::entities::{Achievement, CreateAchievementRequest};
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct AchievementRepository {
    pool: SqlitePool,
}

impl AchievementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        request: &CreateAchievementRequest,
    ) -> ChatResult<Achievement> {
        let title = request.title.trim();
        let game = request.game.trim();
        if title.is_empty() || game.is_empty() {
            return Err(ChatError::InvalidInput(
                "title and game must not be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO achievements (user_id, title, description, game, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(title)
        .bind(&request.description)
        .bind(game)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let achievement_id = result.last_insert_rowid();
        info!(achievement_id, user_id, "achievement recorded");

        Ok(Achievement {
            id: achievement_id,
            user_id,
            title: title.to_string(),
            description: request.description.clone(),
            game: game.to_string(),
            created_at: now,
        })
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: i64) -> ChatResult<Vec<Achievement>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, description, game, created_at
             FROM achievements WHERE user_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_achievement).collect()
    }
}

fn map_achievement(row: &SqliteRow) -> ChatResult<Achievement> {
    Ok(Achievement {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        game: row.try_get("game")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    fn trophy(title: &str) -> CreateAchievementRequest {
        CreateAchievementRequest {
            title: title.to_string(),
            description: None,
            game: "Elden Ring".to_string(),
        }
    }

    #[tokio::test]
    async fn test_achievements_list_newest_first_per_user() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = AchievementRepository::new(pool);

        let first = repo.create(1, &trophy("Elden Lord")).await.unwrap();
        let second = repo.create(1, &trophy("Age of Stars")).await.unwrap();
        repo.create(2, &trophy("Lord of Frenzied Flame")).await.unwrap();

        let listed = repo.list_for_user(1).await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(repo.list_for_user(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_title_or_game_rejected() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = AchievementRepository::new(pool);

        assert!(matches!(
            repo.create(1, &trophy(" ")).await,
            Err(ChatError::InvalidInput(_))
        ));

        let mut no_game = trophy("Speedrun");
        no_game.game = String::new();
        assert!(matches!(
            repo.create(1, &no_game).await,
            Err(ChatError::InvalidInput(_))
        ));
    }
}
