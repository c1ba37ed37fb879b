//! Live connections keyed by user id

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::protocol::ServerEvent;

/// Sending half of one live socket.
///
/// Cloning shares the same outbound queue; the queue is drained by the
/// socket's writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    user_id: i64,
    group_id: Option<i64>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(
        user_id: i64,
        group_id: Option<i64>,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    /// Queue an event; false if the socket is already gone
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<i64, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the handle for its user, replacing any previous one.
    /// Returns the replaced handle.
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().await;
        connections.insert(handle.user_id, handle)
    }

    pub async fn lookup(&self, user_id: i64) -> Option<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.get(&user_id).cloned()
    }

    pub async fn unregister(&self, user_id: i64) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().await;
        connections.remove(&user_id)
    }

    /// Remove the user's entry only if it is still `connection_id`
    pub async fn release(&self, user_id: i64, connection_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(&user_id) {
            Some(current) if current.id == connection_id => {
                connections.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
