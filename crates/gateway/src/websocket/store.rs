//! Persistence seam for the socket relays

use async_trait::async_trait;
use luminaras_database::{
    ChatMessage, ChatResult, CreateGroupMessageRequest, CreateMessageRequest, GroupChatMessage,
    GroupMessageRepository, MessageRepository,
};
use sqlx::SqlitePool;

use super::protocol::{DirectMessageEvent, GroupMessageEvent};

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_direct(&self, event: &DirectMessageEvent) -> ChatResult<ChatMessage>;

    async fn save_group(&self, event: &GroupMessageEvent) -> ChatResult<GroupChatMessage>;
}

/// `MessageStore` over the SQLite repositories
#[derive(Clone)]
pub struct SqliteMessageStore {
    messages: MessageRepository,
    group_messages: GroupMessageRepository,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            group_messages: GroupMessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn save_direct(&self, event: &DirectMessageEvent) -> ChatResult<ChatMessage> {
        self.messages
            .create(&CreateMessageRequest {
                sender_id: event.sender_id,
                receiver_id: event.receiver_id,
                content: event.content.clone(),
            })
            .await
    }

    async fn save_group(&self, event: &GroupMessageEvent) -> ChatResult<GroupChatMessage> {
        self.group_messages
            .create(&CreateGroupMessageRequest {
                group_id: event.group_id,
                sender_id: event.sender_id,
                content: event.content.clone(),
            })
            .await
    }
}
