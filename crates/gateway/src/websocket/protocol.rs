//! Chat socket wire format

use luminaras_database::{ChatMessage, GroupChatMessage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frames accepted from clients.
///
/// Unknown `type` tags fail to parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    Message(InboundMessage),
}

/// Untyped chat payload, before it is classified by session kind
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessageEvent {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessageEvent {
    pub group_id: i64,
    pub sender_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds limit of {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

impl InboundMessage {
    pub fn into_direct(self) -> Result<DirectMessageEvent, FrameError> {
        let receiver_id = self
            .receiver_id
            .ok_or(FrameError::MissingField("receiverId"))?;
        Ok(DirectMessageEvent {
            sender_id: self.sender_id,
            receiver_id,
            content: self.content,
        })
    }

    pub fn into_group(self) -> Result<GroupMessageEvent, FrameError> {
        let group_id = self.group_id.ok_or(FrameError::MissingField("groupId"))?;
        Ok(GroupMessageEvent {
            group_id,
            sender_id: self.sender_id,
            content: self.content,
        })
    }
}

/// Parse a text frame, rejecting anything above `max_bytes`
pub fn parse_frame(text: &str, max_bytes: usize) -> Result<ClientFrame, FrameError> {
    if text.len() > max_bytes {
        return Err(FrameError::TooLarge {
            size: text.len(),
            limit: max_bytes,
        });
    }

    serde_json::from_str(text).map_err(|error| FrameError::Malformed(error.to_string()))
}

/// Events pushed to connected clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    Message(RelayedMessage),
}

/// A persisted record forwarded verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayedMessage {
    Direct(ChatMessage),
    Group(GroupChatMessage),
}

impl From<ChatMessage> for ServerEvent {
    fn from(message: ChatMessage) -> Self {
        ServerEvent::Message(RelayedMessage::Direct(message))
    }
}

impl From<GroupChatMessage> for ServerEvent {
    fn from(message: GroupChatMessage) -> Self {
        ServerEvent::Message(RelayedMessage::Group(message))
    }
}
