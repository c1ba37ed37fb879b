//! Repository for swipe matches.

use crate::entities::{Match, MatchStatus};
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct MatchRepository {
    pool: SqlitePool,
}

impl MatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a pending match initiated by `initiator_id`. One match per pair,
    /// whichever direction it was created in; the pair index settles races
    /// between concurrent creates.
    pub async fn create(&self, initiator_id: i64, target_id: i64) -> ChatResult<Match> {
        if initiator_id == target_id {
            return Err(ChatError::InvalidInput("cannot match with yourself".to_string()));
        }

        if self.find_between(initiator_id, target_id).await?.is_some() {
            return Err(ChatError::MatchAlreadyExists);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO matches (user_id_1, user_id_2, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(initiator_id)
        .bind(target_id)
        .bind(MatchStatus::Pending.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(db) if db.is_unique_violation() => ChatError::MatchAlreadyExists,
            other => other.into(),
        })?;

        let match_id = result.last_insert_rowid();
        info!(match_id, initiator_id, target_id, "created match");

        Ok(Match {
            id: match_id,
            user_id_1: initiator_id,
            user_id_2: target_id,
            status: MatchStatus::Pending,
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, match_id: i64) -> ChatResult<Option<Match>> {
        let row = sqlx::query(
            "SELECT id, user_id_1, user_id_2, status, created_at FROM matches WHERE id = ?",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_match).transpose()
    }

    pub async fn find_between(&self, a: i64, b: i64) -> ChatResult<Option<Match>> {
        let row = sqlx::query(
            "SELECT id, user_id_1, user_id_2, status, created_at FROM matches
             WHERE (user_id_1 = ? AND user_id_2 = ?) OR (user_id_1 = ? AND user_id_2 = ?)
             LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_match).transpose()
    }

    pub async fn list(&self) -> ChatResult<Vec<Match>> {
        let rows = sqlx::query(
            "SELECT id, user_id_1, user_id_2, status, created_at FROM matches ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_match).collect()
    }

    pub async fn list_for_user(&self, user_id: i64) -> ChatResult<Vec<Match>> {
        let rows = sqlx::query(
            "SELECT id, user_id_1, user_id_2, status, created_at FROM matches
             WHERE user_id_1 = ? OR user_id_2 = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_match).collect()
    }

    /// Accept or reject a match. Only the invited side may respond.
    pub async fn respond(
        &self,
        match_id: i64,
        responder_id: i64,
        status: MatchStatus,
    ) -> ChatResult<Match> {
        if status == MatchStatus::Pending {
            return Err(ChatError::InvalidInput(
                "status must be accepted or rejected".to_string(),
            ));
        }

        let mut existing = self
            .find_by_id(match_id)
            .await?
            .ok_or(ChatError::MatchNotFound)?;

        if existing.user_id_2 != responder_id {
            return Err(ChatError::Unauthorized);
        }

        sqlx::query("UPDATE matches SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(match_id)
            .execute(&self.pool)
            .await?;

        info!(match_id, responder_id, status = %status, "match status updated");

        existing.status = status;
        Ok(existing)
    }

    /// Whether the two users share an accepted match
    pub async fn are_matched(&self, a: i64, b: i64) -> ChatResult<bool> {
        Ok(self
            .find_between(a, b)
            .await?
            .is_some_and(|m| m.status == MatchStatus::Accepted))
    }

    pub async fn count(&self) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM matches")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_match(row: &SqliteRow) -> ChatResult<Match> {
    let status: String = row.try_get("status")?;
    Ok(Match {
        id: row.try_get("id")?,
        user_id_1: row.try_get("user_id_1")?,
        user_id_2: row.try_get("user_id_2")?,
        status: status.parse().map_err(ChatError::DatabaseError)?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;
    use crate::initialize_database;
    use luminaras_config::DatabaseConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_match_lifecycle() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MatchRepository::new(pool);

        let pending = repo.create(1, 2).await.unwrap();
        assert_eq!(pending.status, MatchStatus::Pending);
        assert!(!repo.are_matched(1, 2).await.unwrap());

        let accepted = repo.respond(pending.id, 2, MatchStatus::Accepted).await.unwrap();
        assert_eq!(accepted.status, MatchStatus::Accepted);
        assert!(repo.are_matched(1, 2).await.unwrap());
        assert!(repo.are_matched(2, 1).await.unwrap());
        assert!(!repo.are_matched(1, 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_initiator_cannot_accept_own_match() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MatchRepository::new(pool);

        let pending = repo.create(1, 2).await.unwrap();
        assert!(matches!(
            repo.respond(pending.id, 1, MatchStatus::Accepted).await,
            Err(ChatError::Unauthorized)
        ));
        assert!(matches!(
            repo.respond(999, 2, MatchStatus::Accepted).await,
            Err(ChatError::MatchNotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_pair_in_either_direction_rejected() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MatchRepository::new(pool);

        repo.create(1, 2).await.unwrap();
        assert!(matches!(repo.create(1, 2).await, Err(ChatError::MatchAlreadyExists)));
        assert!(matches!(repo.create(2, 1).await, Err(ChatError::MatchAlreadyExists)));
        assert!(matches!(repo.create(5, 5).await, Err(ChatError::InvalidInput(_))));
        assert_eq!(repo.list_for_user(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_returns_every_match_in_creation_order() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MatchRepository::new(pool);

        let first = repo.create(1, 2).await.unwrap();
        let second = repo.create(3, 1).await.unwrap();
        repo.respond(second.id, 1, MatchStatus::Rejected).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![first.id, second.id]);
        assert_eq!(all[1].status, MatchStatus::Rejected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_for_one_pair_store_a_single_match() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("race.db").display()),
            max_connections: 8,
        };
        let repo = MatchRepository::new(initialize_database(&config).await.unwrap());

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let repo = repo.clone();
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                tokio::spawn(async move { repo.create(a, b).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(ChatError::MatchAlreadyExists) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
