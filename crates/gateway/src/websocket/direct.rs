//! Point-to-point relay

use luminaras_database::ChatMessage;
use tracing::{debug, error, info};

use super::protocol::DirectMessageEvent;
use super::{DropReason, RealtimeHub, RelayOutcome};

impl RealtimeHub {
    /// Persist a direct message sent on `session_user`'s socket, then push it
    /// to the receiver if connected.
    pub async fn relay_direct(&self, session_user: i64, event: DirectMessageEvent) -> RelayOutcome {
        if event.sender_id != session_user {
            return RelayOutcome::Dropped(DropReason::SpoofedSender {
                claimed: event.sender_id,
                bound: session_user,
            });
        }
        if event.sender_id == event.receiver_id {
            return RelayOutcome::Dropped(DropReason::SelfMessage);
        }

        let message = match self.store.save_direct(&event).await {
            Ok(message) => message,
            Err(error) => {
                error!(
                    sender_id = event.sender_id,
                    receiver_id = event.receiver_id,
                    %error,
                    "failed to persist direct message"
                );
                return RelayOutcome::PersistFailed;
            }
        };

        let recipients = self.forward_direct(&message).await;
        info!(
            message_id = message.id,
            sender_id = message.sender_id,
            receiver_id = message.receiver_id,
            recipients,
            "direct message relayed"
        );

        RelayOutcome::Delivered {
            message_id: message.id,
            recipients,
        }
    }

    /// Push an already persisted message to its receiver's live connection.
    /// Returns the number of copies queued.
    pub async fn forward_direct(&self, message: &ChatMessage) -> usize {
        let Some(handle) = self.connections.lookup(message.receiver_id).await else {
            debug!(receiver_id = message.receiver_id, "receiver offline");
            return 0;
        };

        usize::from(handle.send(message.clone().into()))
    }
}
