//! Message entity definitions
//!
//! Both message kinds serialize in camelCase because the persisted record is
//! forwarded verbatim over the chat socket.

use serde::{Deserialize, Serialize};

/// A persisted direct message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
}

/// A persisted group chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChatMessage {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupMessageRequest {
    pub group_id: i64,
    pub sender_id: i64,
    pub content: String,
}

/// One row of a user's conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub peer_id: i64,
    pub last_message_id: i64,
    pub last_message_at: String,
}
