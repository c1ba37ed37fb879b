//! Connected members per group channel

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

/// Users currently connected to each group's socket channel.
///
/// This is live presence only; durable membership lives in `group_members`.
#[derive(Debug, Clone, Default)]
pub struct MembershipRegistry {
    groups: Arc<RwLock<HashMap<i64, HashSet<i64>>>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, group_id: i64, user_id: i64) {
        let mut groups = self.groups.write().await;
        groups.entry(group_id).or_default().insert(user_id);
    }

    /// Remove the user; an emptied group entry is dropped
    pub async fn leave(&self, group_id: i64, user_id: i64) {
        let mut groups = self.groups.write().await;
        if let Some(members) = groups.get_mut(&group_id) {
            members.remove(&user_id);
            if members.is_empty() {
                groups.remove(&group_id);
            }
        }
    }

    /// Snapshot of the connected set; empty for unknown groups
    pub async fn members(&self, group_id: i64) -> HashSet<i64> {
        let groups = self.groups.read().await;
        groups.get(&group_id).cloned().unwrap_or_default()
    }

    pub async fn contains_group(&self, group_id: i64) -> bool {
        self.groups.read().await.contains_key(&group_id)
    }
}
