//! Repository for groups and durable group membership.

use crate::entities::{CreateGroupRequest, Group, GroupMember, GroupWithMembers, MemberRole};
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a group and enrol its creator as owner in one transaction
    pub async fn create(&self, creator_id: i64, request: &CreateGroupRequest) -> ChatResult<Group> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ChatError::InvalidInput("group name must not be empty".to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let is_public = request.is_public.unwrap_or(true);

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO groups (name, description, is_public, created_by_id, game_category, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(&request.description)
        .bind(is_public)
        .bind(creator_id)
        .bind(&request.game_category)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let group_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO group_members (group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(group_id)
            .bind(creator_id)
            .bind(MemberRole::Owner.as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(group_id, creator_id, "created group");

        Ok(Group {
            id: group_id,
            name: name.to_string(),
            description: request.description.clone(),
            is_public,
            created_by_id: creator_id,
            game_category: request.game_category.clone(),
            created_at: now,
        })
    }

    pub async fn find_by_id(&self, group_id: i64) -> ChatResult<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, name, description, is_public, created_by_id, game_category, created_at
             FROM groups WHERE id = ?",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_group).transpose()
    }

    pub async fn find_with_members(&self, group_id: i64) -> ChatResult<GroupWithMembers> {
        let group = self
            .find_by_id(group_id)
            .await?
            .ok_or(ChatError::GroupNotFound)?;
        let members = self.list_members(group_id).await?;
        Ok(GroupWithMembers { group, members })
    }

    pub async fn list(&self) -> ChatResult<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT id, name, description, is_public, created_by_id, game_category, created_at
             FROM groups ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_group).collect()
    }

    pub async fn list_members(&self, group_id: i64) -> ChatResult<Vec<GroupMember>> {
        let rows = sqlx::query(
            "SELECT id, group_id, user_id, role, joined_at
             FROM group_members WHERE group_id = ? ORDER BY id ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_member).collect()
    }

    pub async fn is_member(&self, group_id: i64, user_id: i64) -> ChatResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Add a member; joining twice returns the existing membership
    pub async fn add_member(&self, group_id: i64, user_id: i64) -> ChatResult<GroupMember> {
        if self.find_by_id(group_id).await?.is_none() {
            return Err(ChatError::GroupNotFound);
        }

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(MemberRole::Member.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, group_id, user_id, role, joined_at
             FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        map_member(&row)
    }

    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::MemberNotFound);
        }

        info!(group_id, user_id, "removed group member");
        Ok(())
    }

    /// Delete a group along with its memberships and chat history. Only the
    /// creator may delete.
    pub async fn delete(&self, group_id: i64, requester_id: i64) -> ChatResult<()> {
        let group = self
            .find_by_id(group_id)
            .await?
            .ok_or(ChatError::GroupNotFound)?;
        if group.created_by_id != requester_id {
            return Err(ChatError::Unauthorized);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_messages WHERE group_id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(group_id, requester_id, "deleted group");
        Ok(())
    }
}

fn map_group(row: &SqliteRow) -> ChatResult<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_public: row.try_get("is_public")?,
        created_by_id: row.try_get("created_by_id")?,
        game_category: row.try_get("game_category")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_member(row: &SqliteRow) -> ChatResult<GroupMember> {
    let role: String = row.try_get("role")?;
    Ok(GroupMember {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        user_id: row.try_get("user_id")?,
        role: MemberRole::from(role.as_str()),
        joined_at: row.try_get("joined_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CreateGroupMessageRequest;
    use crate::repos::GroupMessageRepository;
    use crate::test_support::migrated_pool;

    fn squad() -> CreateGroupRequest {
        CreateGroupRequest {
            name: "Night Raiders".to_string(),
            description: Some("late-night raids".to_string()),
            is_public: None,
            game_category: Some("MMO".to_string()),
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_owner() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool);

        let group = repo.create(7, &squad()).await.unwrap();
        assert!(group.is_public);

        let detail = repo.find_with_members(group.id).await.unwrap();
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].user_id, 7);
        assert_eq!(detail.members[0].role, MemberRole::Owner);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool);

        let mut request = squad();
        request.name = "   ".to_string();
        assert!(matches!(
            repo.create(1, &request).await,
            Err(ChatError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_join_is_idempotent_and_leave_removes() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool);
        let group = repo.create(1, &squad()).await.unwrap();

        let first = repo.add_member(group.id, 2).await.unwrap();
        let second = repo.add_member(group.id, 2).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, MemberRole::Member);
        assert!(repo.is_member(group.id, 2).await.unwrap());

        repo.remove_member(group.id, 2).await.unwrap();
        assert!(!repo.is_member(group.id, 2).await.unwrap());
        assert!(matches!(
            repo.remove_member(group.id, 2).await,
            Err(ChatError::MemberNotFound)
        ));
    }

    #[tokio::test]
    async fn test_join_unknown_group() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool);

        assert!(matches!(
            repo.add_member(404, 1).await,
            Err(ChatError::GroupNotFound)
        ));
    }

    #[tokio::test]
    async fn test_only_owner_deletes_group() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool.clone());
        let group = repo.create(1, &squad()).await.unwrap();
        repo.add_member(group.id, 2).await.unwrap();

        assert!(matches!(
            repo.delete(group.id, 2).await,
            Err(ChatError::Unauthorized)
        ));
        assert!(repo.find_by_id(group.id).await.unwrap().is_some());

        repo.delete(group.id, 1).await.unwrap();
        assert!(repo.find_by_id(group.id).await.unwrap().is_none());
        assert!(repo.list_members(group.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete(group.id, 1).await,
            Err(ChatError::GroupNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_clears_group_history() {
        let (pool, _temp_dir) = migrated_pool().await;
        let repo = GroupRepository::new(pool.clone());
        let history = GroupMessageRepository::new(pool);
        let group = repo.create(1, &squad()).await.unwrap();

        history
            .create(&CreateGroupMessageRequest {
                group_id: group.id,
                sender_id: 1,
                content: "gg".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(history.count_for_group(group.id).await.unwrap(), 1);

        repo.delete(group.id, 1).await.unwrap();
        assert_eq!(history.count_for_group(group.id).await.unwrap(), 0);
    }
}
