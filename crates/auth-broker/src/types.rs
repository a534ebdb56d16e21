//! Core types for the authentication broker.

use auth_protocol_types::ProviderImageOptions;
use serde::{Deserialize, Serialize};

/// Unique identifier for a registered authentication provider.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the provider ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for an extension running in the host.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionId(pub String);

impl ExtensionId {
    /// Creates an extension ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the extension ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExtensionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExtensionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for an account hosted by a provider.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Creates an account ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the account ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a session, minted by its provider.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Creates a session ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the session ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The account a session belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    pub id: AccountId,
    pub label: String,
}

impl AccountDescriptor {
    /// Display name for prompts: the label, falling back to the id when the
    /// label is empty.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.id.as_str()
        } else {
            &self.label
        }
    }
}

/// An authentication session, owned entirely by its provider.
///
/// The broker only reads sessions; it never mutates or stores them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: SessionId,
    pub access_token: String,
    pub account: AccountDescriptor,
}

/// The extension on whose behalf a broker call is made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub id: ExtensionId,
    pub label: String,
}

impl ExtensionDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: ExtensionId::from_string(id),
            label: label.into(),
        }
    }
}

/// Capability options declared at provider registration.
///
/// `supports_multiple_accounts` is informative only: the broker always
/// treats the first session a provider returns as canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    pub supports_multiple_accounts: bool,
    pub images: Option<ProviderImageOptions>,
}

/// Options for [`AuthenticationBroker::get_session`].
///
/// `force_new_session` and `clear_session_preference` are declared for
/// interface parity but unsupported; passing either is an error.
///
/// [`AuthenticationBroker::get_session`]: crate::AuthenticationBroker::get_session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetSessionOptions {
    pub create_if_none: bool,
    pub silent: bool,
    pub clear_session_preference: bool,
    pub force_new_session: bool,
}

/// Sorts scopes lexicographically (case-sensitive) so that scope-set
/// comparisons are order-independent.
pub fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    let mut sorted = scopes.to_vec();
    sorted.sort();
    sorted
}

/// Canonical dedup key for a normalized scope set.
pub fn scope_key(sorted_scopes: &[String]) -> String {
    sorted_scopes.join(".")
}
