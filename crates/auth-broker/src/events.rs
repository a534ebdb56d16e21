//! Broker-level sessions-changed events.
//!
//! Subscribers receive one [`SessionsChangedEvent`] each time a registered
//! provider reports that its session set changed. Events are fan-out: every
//! live subscriber sees every event fired after it subscribed.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::RwLock;

use crate::types::ProviderId;

/// Identifies the provider a sessions-changed event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: ProviderId,
    pub label: String,
}

/// Fired when a provider's session set changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionsChangedEvent {
    pub provider: ProviderDescriptor,
}

/// A subscription to broker-level sessions-changed events.
pub struct SessionsChangedSubscription {
    receiver: Receiver<SessionsChangedEvent>,
}

impl SessionsChangedSubscription {
    fn new(receiver: Receiver<SessionsChangedEvent>) -> Self {
        Self { receiver }
    }

    /// Blocks the current thread until the next event arrives.
    ///
    /// Returns None once the hub is gone and no events remain queued.
    pub fn recv(&self) -> Option<SessionsChangedEvent> {
        self.receiver.recv().ok()
    }

    /// Attempts to receive an event without blocking.
    pub fn try_recv(&self) -> Option<SessionsChangedEvent> {
        self.receiver.try_recv().ok()
    }

    /// Creates a blocking iterator over incoming events.
    pub fn iter(&self) -> impl Iterator<Item = SessionsChangedEvent> + '_ {
        std::iter::from_fn(|| self.recv())
    }
}

/// Fan-out hub for sessions-changed events.
#[derive(Debug, Default)]
pub struct SessionsChangedHub {
    subscribers: RwLock<Vec<Sender<SessionsChangedEvent>>>,
}

impl SessionsChangedHub {
    /// Creates a new hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    ///
    /// The subscription receives every event fired after this call; events
    /// fired before it are not replayed.
    pub fn subscribe(&self) -> SessionsChangedSubscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .write()
            .expect("lock poisoned")
            .push(sender);
        SessionsChangedSubscription::new(receiver)
    }

    /// Broadcasts an event to all subscribers.
    ///
    /// Dead subscribers (receiver dropped) are removed during the send.
    pub fn notify(&self, event: SessionsChangedEvent) {
        let mut subscribers = self.subscribers.write().expect("lock poisoned");
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Returns the count of registered subscribers.
    ///
    /// May include dead subscribers not yet cleaned up by a notify() call.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().expect("lock poisoned").len()
    }
}
