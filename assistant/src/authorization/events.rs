//! Authorization change notifications.

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per subscriber before slow receivers start lagging.
const EVENT_CAPACITY: usize = 16;

/// Change to the authorized group set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationEvent {
    /// An authorization pass committed a new set.
    GroupsChanged {
        group_ids: Vec<String>,
        owner_user_id: String,
    },
    /// The set was wiped (logout or identity change).
    Cleared,
}

/// Broadcast channel for [`AuthorizationEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuthorizationEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: AuthorizationEvent) {
        if self.tx.send(event).is_err() {
            debug!("No authorization event subscribers");
        }
    }
}
