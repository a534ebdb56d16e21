//! The session request ledger.
//!
//! Tracks "an extension asked for a session non-interactively and none
//! existed yet". Requests are deduplicated per (provider, extension,
//! scope-set) and surfaced to an operator-facing menu that can trigger
//! interactive sign-in later.
//!
//! The check-and-insert in [`SessionRequestLedger::queue`] is synchronous:
//! both the duplicate lookup and the insert happen under one lock, so two
//! calls racing through the no-session path cannot enqueue duplicates.

use auth_protocol_types::SessionRequestInfo;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{scope_key, ExtensionDescriptor, ExtensionId, ProviderId};

/// A queued sign-in request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub request_id: String,
    pub provider_id: ProviderId,
    pub extension_id: ExtensionId,
    pub extension_label: String,
    /// Scopes the extension asked for, sorted lexicographically.
    pub scopes: Vec<String>,
}

impl From<SessionRequest> for SessionRequestInfo {
    fn from(request: SessionRequest) -> Self {
        Self {
            request_id: request.request_id,
            provider_id: request.provider_id.0,
            extension_id: request.extension_id.0,
            extension_label: request.extension_label,
            scopes: request.scopes,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    by_id: HashMap<String, SessionRequest>,
    /// provider → scope key → extension ids with a live request.
    scope_index: HashMap<ProviderId, HashMap<String, Vec<ExtensionId>>>,
}

/// Ledger of pending sign-in requests.
#[derive(Debug, Default)]
pub struct SessionRequestLedger {
    state: Mutex<LedgerState>,
}

impl SessionRequestLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request unless one is already live for the same
    /// (provider, extension, scope-set).
    ///
    /// Returns the new request id, or None on a duplicate. `sorted_scopes`
    /// must already be normalized.
    pub fn queue(
        &self,
        provider_id: &ProviderId,
        extension: &ExtensionDescriptor,
        sorted_scopes: &[String],
    ) -> Option<String> {
        let key = scope_key(sorted_scopes);
        let mut state = self.state.lock().expect("lock poisoned");

        if let Some(extensions) = state
            .scope_index
            .get(provider_id)
            .and_then(|scopes| scopes.get(&key))
        {
            if extensions.contains(&extension.id) {
                return None;
            }
        }

        let ordinal = state
            .by_id
            .values()
            .filter(|r| &r.provider_id == provider_id)
            .count();
        let request_id = format!("{provider_id}-{}-{ordinal}", extension.id);

        state.by_id.insert(
            request_id.clone(),
            SessionRequest {
                request_id: request_id.clone(),
                provider_id: provider_id.clone(),
                extension_id: extension.id.clone(),
                extension_label: extension.label.clone(),
                scopes: sorted_scopes.to_vec(),
            },
        );
        state
            .scope_index
            .entry(provider_id.clone())
            .or_default()
            .entry(key)
            .or_default()
            .push(extension.id.clone());

        Some(request_id)
    }

    /// Looks up a request by id.
    pub fn get(&self, request_id: &str) -> Option<SessionRequest> {
        let state = self.state.lock().expect("lock poisoned");
        state.by_id.get(request_id).cloned()
    }

    /// Removes one request by id, dropping its scope-index entry too.
    ///
    /// Returns the removed request, or None if the id is unknown.
    pub fn remove(&self, request_id: &str) -> Option<SessionRequest> {
        let mut state = self.state.lock().expect("lock poisoned");
        let request = state.by_id.remove(request_id)?;

        let key = scope_key(&request.scopes);
        if let Some(scopes) = state.scope_index.get_mut(&request.provider_id) {
            if let Some(extensions) = scopes.get_mut(&key) {
                extensions.retain(|id| id != &request.extension_id);
                if extensions.is_empty() {
                    scopes.remove(&key);
                }
            }
            if scopes.is_empty() {
                state.scope_index.remove(&request.provider_id);
            }
        }
        Some(request)
    }

    /// Removes every request the given extension has queued under the
    /// given provider (any scope-set).
    ///
    /// Called when the extension obtains a session through any path.
    pub fn remove_for_extension(&self, provider_id: &ProviderId, extension_id: &ExtensionId) {
        let ids: Vec<String> = {
            let state = self.state.lock().expect("lock poisoned");
            state
                .by_id
                .values()
                .filter(|r| &r.provider_id == provider_id && &r.extension_id == extension_id)
                .map(|r| r.request_id.clone())
                .collect()
        };
        for id in ids {
            self.remove(&id);
        }
    }

    /// Drops every request and the whole scope-key index for a provider.
    ///
    /// Called after an operator-triggered sign-in succeeds: the provider
    /// can now supply a session to satisfy every pending ask.
    pub fn clear_provider(&self, provider_id: &ProviderId) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.by_id.retain(|_, r| &r.provider_id != provider_id);
        state.scope_index.remove(provider_id);
    }

    /// Returns the live requests for one provider.
    pub fn for_provider(&self, provider_id: &ProviderId) -> Vec<SessionRequest> {
        let state = self.state.lock().expect("lock poisoned");
        let mut requests: Vec<SessionRequest> = state
            .by_id
            .values()
            .filter(|r| &r.provider_id == provider_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.request_id.cmp(&b.request_id));
        requests
    }

    /// Returns every live request.
    pub fn all(&self) -> Vec<SessionRequest> {
        let state = self.state.lock().expect("lock poisoned");
        let mut requests: Vec<SessionRequest> = state.by_id.values().cloned().collect();
        requests.sort_by(|a, b| a.request_id.cmp(&b.request_id));
        requests
    }

    /// Returns the number of live requests.
    pub fn len(&self) -> usize {
        self.state.lock().expect("lock poisoned").by_id.len()
    }

    /// Returns true if no requests are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
