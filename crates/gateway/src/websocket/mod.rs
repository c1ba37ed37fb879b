//! Realtime chat over WebSockets
//!
//! A [`RealtimeHub`] owns the live connection registry and the per-group
//! presence sets. Sessions are created by the upgrade router, inbound frames
//! are persisted through a [`MessageStore`] and the stored record is pushed to
//! whichever recipients are connected at that moment. Delivery is best effort:
//! offline recipients pick messages up from history.

pub mod direct;
pub mod group;
pub mod membership;
pub mod protocol;
pub mod registry;
pub mod store;
pub mod upgrade;

use std::sync::Arc;

use axum::{routing::get, Router};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::GatewayState;

pub use membership::MembershipRegistry;
pub use protocol::{
    ClientFrame, DirectMessageEvent, FrameError, GroupMessageEvent, RelayedMessage, ServerEvent,
};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use store::{MessageStore, SqliteMessageStore};
pub use upgrade::{classify_upgrade, websocket_handler, UpgradeDecision};

/// What a socket was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Direct { user_id: i64 },
    Group { group_id: i64, user_id: i64 },
}

impl SessionKind {
    pub fn user_id(&self) -> i64 {
        match *self {
            SessionKind::Direct { user_id } | SessionKind::Group { user_id, .. } => user_id,
        }
    }

    pub fn group_id(&self) -> Option<i64> {
        match *self {
            SessionKind::Direct { .. } => None,
            SessionKind::Group { group_id, .. } => Some(group_id),
        }
    }
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Persisted and queued to `recipients` live connections
    Delivered { message_id: i64, recipients: usize },
    Dropped(DropReason),
    PersistFailed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DropReason {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("sender {claimed} does not match session user {bound}")]
    SpoofedSender { claimed: i64, bound: i64 },

    #[error("group {claimed} does not match session group {bound}")]
    GroupMismatch { claimed: i64, bound: i64 },

    #[error("sender and receiver are the same user")]
    SelfMessage,
}

#[derive(Clone)]
pub struct RealtimeHub {
    connections: ConnectionRegistry,
    memberships: MembershipRegistry,
    store: Arc<dyn MessageStore>,
}

impl RealtimeHub {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            memberships: MembershipRegistry::new(),
            store,
        }
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn memberships(&self) -> &MembershipRegistry {
        &self.memberships
    }

    /// Register a new socket for `session`. The returned receiver feeds the
    /// socket's writer.
    pub async fn connect(
        &self,
        session: SessionKind,
    ) -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (handle, outbound) = ConnectionHandle::new(session.user_id(), session.group_id());

        if let Some(previous) = self.connections.register(handle.clone()).await {
            debug!(
                user_id = handle.user_id(),
                replaced = %previous.id(),
                "connection replaced"
            );
        }
        if let Some(group_id) = session.group_id() {
            self.memberships.join(group_id, session.user_id()).await;
        }

        info!(
            user_id = handle.user_id(),
            group_id = ?handle.group_id(),
            connection_id = %handle.id(),
            "chat connection opened"
        );
        (handle, outbound)
    }

    /// Tear down a socket's registrations. A connection that was already
    /// replaced leaves the newer registration alone.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        let user_id = handle.user_id();
        let released = self.connections.release(user_id, handle.id()).await;

        if let Some(group_id) = handle.group_id() {
            let replacement_in_group = !released
                && self
                    .connections
                    .lookup(user_id)
                    .await
                    .is_some_and(|current| current.group_id() == Some(group_id));

            if !replacement_in_group {
                self.memberships.leave(group_id, user_id).await;
            }
        }

        info!(
            user_id,
            group_id = ?handle.group_id(),
            connection_id = %handle.id(),
            "chat connection closed"
        );
    }

    /// Parse, validate, persist and forward one text frame
    pub async fn handle_frame(
        &self,
        session: SessionKind,
        text: &str,
        max_bytes: usize,
    ) -> RelayOutcome {
        let outcome = match protocol::parse_frame(text, max_bytes) {
            Ok(ClientFrame::Message(message)) => match session {
                SessionKind::Direct { user_id } => match message.into_direct() {
                    Ok(event) => self.relay_direct(user_id, event).await,
                    Err(error) => RelayOutcome::Dropped(error.into()),
                },
                SessionKind::Group { group_id, user_id } => match message.into_group() {
                    Ok(event) => self.relay_group(user_id, group_id, event).await,
                    Err(error) => RelayOutcome::Dropped(error.into()),
                },
            },
            Err(error) => RelayOutcome::Dropped(error.into()),
        };

        if let RelayOutcome::Dropped(reason) = &outcome {
            warn!(
                user_id = session.user_id(),
                group_id = ?session.group_id(),
                %reason,
                "dropping chat frame"
            );
        }
        outcome
    }
}

/// Create all WebSocket routes
pub fn create_websocket_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/ws/groups/:group_id", get(websocket_handler))
}

#[cfg(test)]
mod tests {
    use super::store::fakes::MemoryStore;
    use super::*;

    fn hub() -> RealtimeHub {
        RealtimeHub::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_group_connect_joins_and_disconnect_leaves() {
        let hub = hub();
        let session = SessionKind::Group {
            group_id: 10,
            user_id: 2,
        };

        let (handle, _rx) = hub.connect(session).await;
        assert!(hub.memberships().members(10).await.contains(&2));
        assert!(hub.connections().lookup(2).await.is_some());

        hub.disconnect(&handle).await;
        assert!(!hub.memberships().contains_group(10).await);
        assert!(hub.connections().lookup(2).await.is_none());
    }

    #[tokio::test]
    async fn test_replaced_connection_closing_late_keeps_replacement() {
        let hub = hub();
        let session = SessionKind::Group {
            group_id: 10,
            user_id: 2,
        };

        let (old, _old_rx) = hub.connect(session).await;
        let (new, _new_rx) = hub.connect(session).await;

        hub.disconnect(&old).await;
        assert_eq!(hub.connections().lookup(2).await.unwrap().id(), new.id());
        assert!(hub.memberships().members(10).await.contains(&2));

        hub.disconnect(&new).await;
        assert!(hub.connections().is_empty().await);
        assert!(!hub.memberships().contains_group(10).await);
    }

    #[tokio::test]
    async fn test_switching_groups_leaves_the_old_group_on_close() {
        let hub = hub();
        let (in_ten, _rx10) = hub
            .connect(SessionKind::Group {
                group_id: 10,
                user_id: 2,
            })
            .await;
        let (_in_eleven, _rx11) = hub
            .connect(SessionKind::Group {
                group_id: 11,
                user_id: 2,
            })
            .await;

        hub.disconnect(&in_ten).await;
        assert!(!hub.memberships().contains_group(10).await);
        assert!(hub.memberships().members(11).await.contains(&2));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let hub = hub();
        let session = SessionKind::Direct { user_id: 1 };

        for text in ["{", r#"{"type":"ping"}"#, r#"{"type":"message","senderId":1,"content":"x"}"#] {
            assert!(matches!(
                hub.handle_frame(session, text, 1024).await,
                RelayOutcome::Dropped(DropReason::Frame(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_oversized_frame_is_dropped() {
        let hub = hub();
        let text = r#"{"type":"message","senderId":1,"receiverId":2,"content":"hello there"}"#;

        assert_eq!(
            hub.handle_frame(SessionKind::Direct { user_id: 1 }, text, 16).await,
            RelayOutcome::Dropped(DropReason::Frame(FrameError::TooLarge {
                size: text.len(),
                limit: 16,
            }))
        );
    }
}
