//! Update notification contracts for the authentication broker.
//!
//! The broker emits a [`ProviderUpdate`] after committing any change that
//! the UI may need to re-render: provider registration and unregistration,
//! a provider's own session-change event, an allowance write, or a queued
//! sign-in request. Returning an already-allowed session emits nothing.

use auth_protocol_types::ProviderUpdate;
use std::sync::Mutex;

/// A sink that receives provider update notifications from the broker.
///
/// Implementations decide what a notification means — typically pushing it
/// to the UI on the `authentication-provider-update` channel.
pub trait ProviderUpdateSink: Send + Sync {
    /// Deliver one update notification.
    ///
    /// Called after the corresponding ledger change has been applied.
    fn emit(&self, update: ProviderUpdate);
}

/// A no-op sink that discards all updates.
///
/// Useful for embedders with no UI surface.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProviderUpdateSink for NullSink {
    fn emit(&self, _update: ProviderUpdate) {
        // Intentionally empty - discard all updates
    }
}

/// A sink that records all updates for testing.
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<ProviderUpdate>>,
}

impl RecordingSink {
    /// Creates a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded updates.
    pub fn updates(&self) -> Vec<ProviderUpdate> {
        self.updates.lock().expect("lock poisoned").clone()
    }

    /// Clears all recorded updates.
    pub fn clear(&self) {
        self.updates.lock().expect("lock poisoned").clear();
    }

    /// Returns the number of recorded updates.
    pub fn len(&self) -> usize {
        self.updates.lock().expect("lock poisoned").len()
    }

    /// Returns true if no updates have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProviderUpdateSink for RecordingSink {
    fn emit(&self, update: ProviderUpdate) {
        self.updates.lock().expect("lock poisoned").push(update);
    }
}
