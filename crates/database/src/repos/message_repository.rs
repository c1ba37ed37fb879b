//! Repository for direct message data access operations.

use crate::entities::{ChatMessage, ConversationSummary, CreateMessageRequest};
use crate::types::{ChatError, ChatResult, Pagination};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for direct message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new direct message; id and timestamp are assigned here
    pub async fn create(&self, request: &CreateMessageRequest) -> ChatResult<ChatMessage> {
        if request.sender_id == request.receiver_id {
            return Err(ChatError::SelfMessage);
        }

        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (sender_id, receiver_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(&request.content)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id,
            sender_id = request.sender_id,
            receiver_id = request.receiver_id,
            "created direct message"
        );

        Ok(ChatMessage {
            id: message_id,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            content: request.content.clone(),
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<ChatMessage>> {
        let row = sqlx::query(
            "SELECT id, sender_id, receiver_id, content, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_message).transpose()
    }

    /// Messages exchanged between two users, oldest first
    pub async fn find_conversation(
        &self,
        user_id: i64,
        peer_id: i64,
        page: Pagination,
    ) -> ChatResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, content, created_at FROM messages
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
             ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(peer_id)
        .bind(peer_id)
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_message).collect()
    }

    /// Peers the user has exchanged messages with, most recent first
    pub async fn find_conversations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> ChatResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            "SELECT peer_id, MAX(id) AS last_message_id, MAX(created_at) AS last_message_at FROM (
                 SELECT receiver_id AS peer_id, id, created_at FROM messages WHERE sender_id = ?
                 UNION ALL
                 SELECT sender_id AS peer_id, id, created_at FROM messages WHERE receiver_id = ?
             )
             GROUP BY peer_id
             ORDER BY last_message_id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> ChatResult<ConversationSummary> {
                Ok(ConversationSummary {
                    peer_id: row.try_get("peer_id")?,
                    last_message_id: row.try_get("last_message_id")?,
                    last_message_at: row.try_get("last_message_at")?,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_message(row: &SqliteRow) -> ChatResult<ChatMessage> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::migrated_pool;

    fn request(sender_id: i64, receiver_id: i64, content: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            sender_id,
            receiver_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamp() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MessageRepository::new(pool);

        let message = repo.create(&request(1, 2, "hi")).await.unwrap();
        assert!(message.id > 0);
        assert_eq!(message.sender_id, 1);
        assert_eq!(message.receiver_id, 2);
        assert_eq!(message.content, "hi");
        assert!(chrono::DateTime::parse_from_rfc3339(&message.created_at).is_ok());

        let stored = repo.find_by_id(message.id).await.unwrap();
        assert_eq!(stored, Some(message));
    }

    #[tokio::test]
    async fn test_self_message_is_rejected() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MessageRepository::new(pool);

        let result = repo.create(&request(4, 4, "echo")).await;
        assert!(matches!(result, Err(ChatError::SelfMessage)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_conversation_includes_both_directions_in_order() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MessageRepository::new(pool);

        repo.create(&request(1, 2, "first")).await.unwrap();
        repo.create(&request(2, 1, "second")).await.unwrap();
        repo.create(&request(1, 3, "elsewhere")).await.unwrap();
        repo.create(&request(1, 2, "third")).await.unwrap();

        let history = repo
            .find_conversation(1, 2, Pagination::default())
            .await
            .unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        let page = repo
            .find_conversation(2, 1, Pagination::new(Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "second");
    }

    #[tokio::test]
    async fn test_conversations_ordered_by_latest_message() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = MessageRepository::new(pool);

        repo.create(&request(1, 2, "a")).await.unwrap();
        repo.create(&request(3, 1, "b")).await.unwrap();
        let latest = repo.create(&request(2, 1, "c")).await.unwrap();

        let conversations = repo.find_conversations(1, 50).await.unwrap();
        let peers: Vec<_> = conversations.iter().map(|c| c.peer_id).collect();
        assert_eq!(peers, vec![2, 3]);
        assert_eq!(conversations[0].last_message_id, latest.id);
    }
}
