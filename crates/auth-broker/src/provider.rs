//! The authentication provider seam.
//!
//! A provider is an external plugin representing one identity source. The
//! broker never authenticates against anything itself; it reads, creates,
//! and removes sessions through this trait and reacts to the provider's
//! change stream. Provider failures propagate unchanged to the broker's
//! caller — retries, if any, are the provider's responsibility.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{AuthSession, SessionId};

/// Receives one `()` per session-change event from a provider.
///
/// Providers mint a fresh listener per [`AuthenticationProvider::subscribe_changes`]
/// call; dropping the listener ends the subscription.
pub type SessionChangeListener = mpsc::UnboundedReceiver<()>;

/// An external identity source capable of listing, creating, and removing
/// sessions.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Returns the sessions matching the given scope filter, or all
    /// sessions when no filter is given. Order matters: the broker treats
    /// the first returned session as canonical.
    async fn get_sessions(&self, scopes: Option<&[String]>) -> anyhow::Result<Vec<AuthSession>>;

    /// Interactively creates a session carrying the given scopes.
    async fn create_session(&self, scopes: &[String]) -> anyhow::Result<AuthSession>;

    /// Removes the session with the given id.
    async fn remove_session(&self, session_id: &SessionId) -> anyhow::Result<()>;

    /// Subscribes to the provider's session-change stream.
    fn subscribe_changes(&self) -> SessionChangeListener;
}
