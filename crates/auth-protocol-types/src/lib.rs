//! Pure protocol types for the extension authentication broker.
//!
//! This crate contains only data types and serialization — no I/O, no async,
//! no transport. It defines the shared language between the broker and the
//! UI surface that renders provider state: update notifications, provider
//! info projections, pending sign-in requests, and accounts-menu entries.

use serde::{Deserialize, Serialize};

/// Channel name for broker update notifications.
///
/// The host pushes a [`ProviderUpdate`] on this channel whenever provider
/// state observable by the UI may have changed.
pub const PROVIDER_UPDATE_CHANNEL: &str = "authentication-provider-update";

/// Payload of a provider update notification.
///
/// Carries only the provider id; the UI re-queries the broker for details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUpdate {
    /// Id of the provider whose observable state changed.
    pub id: String,
}

/// Display images for a provider, by theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderImageOptions {
    pub light: Option<String>,
    pub dark: Option<String>,
}

/// One account currently known to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub account_id: String,
    pub account_label: String,
}

/// A pending sign-in request queued by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequestInfo {
    pub request_id: String,
    pub provider_id: String,
    pub extension_id: String,
    pub extension_label: String,
    /// Scopes the extension asked for, sorted lexicographically.
    pub scopes: Vec<String>,
}

/// Projection of one registered provider for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub label: String,
    /// Accounts currently backing sessions on this provider.
    pub accounts: Vec<ProviderAccount>,
    pub supports_multiple_accounts: bool,
    pub images: Option<ProviderImageOptions>,
    /// Outstanding sign-in requests. Populated only while the provider has
    /// zero sessions; empty otherwise regardless of ledger contents.
    pub session_requests: Vec<SessionRequestInfo>,
}

/// One entry in the accounts menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountsMenuEntry {
    /// "Sign in with {provider} to use {extension}" — actions the operator
    /// can trigger to satisfy a pending request.
    SignInRequest { request_id: String, label: String },
    /// "{account} ({provider})" — an account currently signed in.
    Account {
        provider_id: String,
        account_id: String,
        label: String,
    },
}
