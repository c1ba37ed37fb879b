//! Repository for group chat history.

use crate::entities::{CreateGroupMessageRequest, GroupChatMessage};
use crate::types::{ChatResult, Pagination};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct GroupMessageRepository {
    pool: SqlitePool,
}

impl GroupMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a group message. Durable membership is the caller's concern.
    pub async fn create(&self, request: &CreateGroupMessageRequest) -> ChatResult<GroupChatMessage> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO group_messages (group_id, sender_id, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(request.group_id)
        .bind(request.sender_id)
        .bind(&request.content)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id,
            group_id = request.group_id,
            sender_id = request.sender_id,
            "created group message"
        );

        Ok(GroupChatMessage {
            id: message_id,
            group_id: request.group_id,
            sender_id: request.sender_id,
            content: request.content.clone(),
            created_at: now,
        })
    }

    /// Group history, oldest first
    pub async fn find_by_group(
        &self,
        group_id: i64,
        page: Pagination,
    ) -> ChatResult<Vec<GroupChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, group_id, sender_id, content, created_at FROM group_messages
             WHERE group_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(group_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_group_message).collect()
    }

    pub async fn count_for_group(&self, group_id: i64) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM group_messages WHERE group_id = ?")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count(&self) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM group_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_group_message(row: &SqliteRow) -> ChatResult<GroupChatMessage> {
    Ok(GroupChatMessage {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}
