//! Group broadcast relay

use luminaras_database::GroupChatMessage;
use tracing::{error, info};

use super::protocol::GroupMessageEvent;
use super::{DropReason, RealtimeHub, RelayOutcome};

impl RealtimeHub {
    /// Persist a message sent on a group socket, then push it to every other
    /// connected member of that group.
    ///
    /// Only live presence is consulted here; durable membership is enforced
    /// on the REST path.
    pub async fn relay_group(
        &self,
        session_user: i64,
        session_group: i64,
        event: GroupMessageEvent,
    ) -> RelayOutcome {
        if event.group_id != session_group {
            return RelayOutcome::Dropped(DropReason::GroupMismatch {
                claimed: event.group_id,
                bound: session_group,
            });
        }
        if event.sender_id != session_user {
            return RelayOutcome::Dropped(DropReason::SpoofedSender {
                claimed: event.sender_id,
                bound: session_user,
            });
        }

        let message = match self.store.save_group(&event).await {
            Ok(message) => message,
            Err(error) => {
                error!(
                    group_id = event.group_id,
                    sender_id = event.sender_id,
                    %error,
                    "failed to persist group message"
                );
                return RelayOutcome::PersistFailed;
            }
        };

        let recipients = self.forward_group(&message).await;
        info!(
            message_id = message.id,
            group_id = message.group_id,
            sender_id = message.sender_id,
            recipients,
            "group message relayed"
        );

        RelayOutcome::Delivered {
            message_id: message.id,
            recipients,
        }
    }

    /// Push an already persisted group message to the group's connected
    /// members, excluding its sender. Returns the number of copies queued.
    pub async fn forward_group(&self, message: &GroupChatMessage) -> usize {
        let members = self.memberships.members(message.group_id).await;

        let mut delivered = 0;
        for user_id in members.into_iter().filter(|id| *id != message.sender_id) {
            if let Some(handle) = self.connections.lookup(user_id).await {
                if handle.send(message.clone().into()) {
                    delivered += 1;
                }
            }
        }
        delivered
    }
}
