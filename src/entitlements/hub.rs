use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::models::SubscriptionChange;

const CHANNEL_CAPACITY: usize = 16;

/// key: entitlement-change-hub -> per-user fan-out of subscription change events
#[derive(Default)]
pub struct SubscriptionChangeHub {
    channels: DashMap<Uuid, broadcast::Sender<SubscriptionChange>>,
}

impl SubscriptionChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<SubscriptionChange> {
        match self.channels.entry(user_id) {
            Entry::Occupied(e) => e.get().subscribe(),
            Entry::Vacant(v) => {
                let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
                v.insert(tx);
                rx
            }
        }
    }

    /// Returns the number of receivers reached. Channels with no receivers left are dropped.
    pub fn publish(&self, change: SubscriptionChange) -> usize {
        let delivered = match self.channels.get(&change.user_id) {
            Some(tx) => tx.send(change).unwrap_or(0),
            None => return 0,
        };
        if delivered == 0 {
            self.channels
                .remove_if(&change.user_id, |_, tx| tx.receiver_count() == 0);
        }
        delivered
    }

    /// Drops the user's channel once its last receiver is gone.
    pub fn release(&self, user_id: Uuid) -> bool {
        self.channels
            .remove_if(&user_id, |_, tx| tx.receiver_count() == 0)
            .is_some()
    }

    pub fn watched_users(&self) -> usize {
        self.channels.len()
    }
}
