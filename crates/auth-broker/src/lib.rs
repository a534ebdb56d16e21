//! # Extension Authentication Broker
//!
//! Mediates access to authentication provider plugins on behalf of many
//! independent, mutually-untrusting extensions running inside one host
//! process.
//!
//! ## Core Invariants
//!
//! - **The account is the unit of trust** - allowances are per
//!   (provider, account, extension), never per provider
//! - **Interactive declines are not persisted** - only an explicit "Allow"
//!   writes an allowance; the user is asked again next time
//! - **The creating extension is auto-trusted** - creating a session grants
//!   the creator access to the new account without a prompt
//! - **Silent calls never prompt** - and never write ledgers on a miss
//! - **One live request per (provider, extension, scope-set)** - the
//!   check-and-insert is synchronous, so concurrent misses cannot enqueue
//!   duplicates
//!
//! ## Architecture
//!
//! ```text
//! extension ──> AuthenticationBroker ──> AuthenticationProvider
//!                   │        │
//!                   │        └──> PromptGateway (user decisions)
//!                   │
//!                   ├── AllowanceStore      (provider, account) -> decisions
//!                   ├── SessionRequestLedger pending sign-in asks
//!                   ├── AccountUsageLedger   sign-out bookkeeping
//!                   └── ProviderUpdateSink   UI notifications
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use auth_broker::{
//!     AuthenticationBroker, ExtensionDescriptor, GetSessionOptions, ProviderId, StaticPrompt,
//!     NullSink,
//! };
//!
//! # async fn example(provider: Arc<dyn auth_broker::AuthenticationProvider>) -> anyhow::Result<()> {
//! let broker = AuthenticationBroker::new(Arc::new(StaticPrompt::answering(1)), NullSink);
//! let registration = broker.register_authentication_provider(
//!     ProviderId::from_string("github"),
//!     "GitHub",
//!     provider,
//!     None,
//! )?;
//!
//! let extension = ExtensionDescriptor::new("my-ext", "My Extension");
//! let session = broker
//!     .get_session(
//!         &extension,
//!         &ProviderId::from_string("github"),
//!         &["repo".to_string()],
//!         GetSessionOptions {
//!             create_if_none: true,
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//!
//! registration.dispose();
//! # let _ = session;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - [`broker`] - The broker engine (orchestration)
//! - [`provider`] - The authentication provider seam
//! - [`prompt`] - The prompt gateway seam
//! - [`allowance`] - Access allowance store
//! - [`requests`] - Session request ledger
//! - [`usage`] - Account usage ledger
//! - [`update_sink`] - Update notification contracts
//! - [`events`] - Broker-level sessions-changed events
//! - [`types`] - Core types

pub mod allowance;
mod broker;
pub mod error;
pub mod events;
pub mod prompt;
pub mod provider;
pub mod requests;
pub mod types;
pub mod update_sink;
pub mod usage;

#[cfg(test)]
mod tests;

pub use allowance::{AllowanceStore, AllowedExtension};
pub use broker::{AuthenticationBroker, ProviderRegistrationHandle};
pub use error::{BrokerError, BrokerResult};
pub use events::{
    ProviderDescriptor, SessionsChangedEvent, SessionsChangedHub, SessionsChangedSubscription,
};
pub use prompt::{
    MessageBoxKind, MessageBoxRequest, MessageBoxResponse, PendingPrompt, PromptGateway,
    QueuedPrompt, StaticPrompt,
};
pub use provider::{AuthenticationProvider, SessionChangeListener};
pub use requests::SessionRequest;
pub use types::{
    normalize_scopes, scope_key, AccountDescriptor, AccountId, AuthSession, ExtensionDescriptor,
    ExtensionId, GetSessionOptions, ProviderId, ProviderOptions, SessionId,
};
pub use update_sink::{NullSink, ProviderUpdateSink, RecordingSink};
pub use usage::{AccountUsageLedger, AccountUsageRecord};
