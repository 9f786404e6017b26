//! Session notifications scoped to one `WalletSession`.
//!
//! Each session owns its bus. Subscribers hold a broadcast receiver and unsubscribe by
//! dropping it, so nothing outlives the session that created it.

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { address: String },
    Disconnected,
    /// Non-fatal message the UI should show to the user.
    Notice(String),
}

/// Events raised by a wallet outside of any session call, such as an extension or a
/// paired mobile wallet reporting a login or a logout on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalWalletEvent {
    /// Raw account token JSON as delivered by the wallet.
    Connected(String),
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is not an error.
        if self.sender.send(event).is_err() {
            log::debug!("Session event dropped: no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
