//! The authentication broker engine.
//!
//! The broker sequences four owned components (provider registry, access
//! allowance store, session request ledger, account usage ledger) and two
//! external collaborators (the providers themselves and the prompt
//! gateway).
//!
//! # Write Path (strict order)
//!
//! 1. Validate inputs (before any ledger mutation or provider call)
//! 2. Await the provider / prompt gateway
//! 3. Mutate ledgers
//! 4. Emit the update notification
//!
//! Mid-sequence collaborator failures leave ledgers untouched: the caller
//! sees the rejection and may retry, which re-prompts.
//!
//! # Locking
//!
//! All mutable state sits behind std mutexes that are never held across an
//! await. The session-request check-and-insert is a single synchronous
//! ledger call, so concurrent misses for the same (provider, extension,
//! scope-set) cannot enqueue duplicates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use auth_protocol_types::{
    AccountsMenuEntry, ProviderAccount, ProviderInfo, ProviderUpdate, SessionRequestInfo,
};
use tokio::task::JoinHandle;

use crate::allowance::{AllowanceStore, AllowedExtension};
use crate::error::{BrokerError, BrokerResult};
use crate::events::{
    ProviderDescriptor, SessionsChangedEvent, SessionsChangedHub, SessionsChangedSubscription,
};
use crate::prompt::{MessageBoxKind, MessageBoxRequest, PromptGateway};
use crate::provider::{AuthenticationProvider, SessionChangeListener};
use crate::requests::SessionRequestLedger;
use crate::types::{
    normalize_scopes, AccountId, AuthSession, ExtensionDescriptor, ExtensionId, GetSessionOptions,
    ProviderId, ProviderOptions, SessionId,
};
use crate::update_sink::ProviderUpdateSink;
use crate::usage::AccountUsageLedger;

/// One registered provider and its live plumbing.
struct ProviderRegistration {
    label: String,
    options: ProviderOptions,
    provider: Arc<dyn AuthenticationProvider>,
    /// Task forwarding the provider's change stream into the broker.
    forwarder: JoinHandle<()>,
}

struct BrokerInner<S> {
    providers: Mutex<HashMap<ProviderId, ProviderRegistration>>,
    allowances: AllowanceStore,
    requests: SessionRequestLedger,
    usage: AccountUsageLedger,
    sessions_changed: SessionsChangedHub,
    prompts: Arc<dyn PromptGateway>,
    sink: S,
}

/// The extension authentication broker.
///
/// Cheap to clone; all clones share one set of ledgers. Construct one per
/// host process and hand clones to callers.
pub struct AuthenticationBroker<S: ProviderUpdateSink> {
    inner: Arc<BrokerInner<S>>,
}

impl<S: ProviderUpdateSink> Clone for AuthenticationBroker<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Handle returned by provider registration.
///
/// Disposing unregisters the provider: the change-stream forwarder stops,
/// the registration is removed, and one more update notification goes out.
/// Consuming `self` makes a second release impossible. Allowances and
/// usage records tied to the provider are retained; they survive
/// re-registration under the same id.
pub struct ProviderRegistrationHandle<S: ProviderUpdateSink> {
    inner: Weak<BrokerInner<S>>,
    id: ProviderId,
}

impl<S: ProviderUpdateSink> ProviderRegistrationHandle<S> {
    /// The id this handle registered.
    pub fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    /// Unregisters the provider.
    pub fn dispose(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let removed = inner
            .providers
            .lock()
            .expect("lock poisoned")
            .remove(&self.id);
        if let Some(registration) = removed {
            registration.forwarder.abort();
            tracing::info!("broker: unregistered authentication provider {}", self.id);
            inner.sink.emit(ProviderUpdate {
                id: self.id.to_string(),
            });
        }
    }
}

impl<S: ProviderUpdateSink + 'static> AuthenticationBroker<S> {
    /// Creates a broker with the given prompt gateway and update sink.
    pub fn new(prompts: Arc<dyn PromptGateway>, sink: S) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                providers: Mutex::new(HashMap::new()),
                allowances: AllowanceStore::new(),
                requests: SessionRequestLedger::new(),
                usage: AccountUsageLedger::new(),
                sessions_changed: SessionsChangedHub::new(),
                prompts,
                sink,
            }),
        }
    }

    /// Returns a reference to the update sink.
    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    /// Subscribes to broker-level sessions-changed events.
    pub fn subscribe_sessions_changed(&self) -> SessionsChangedSubscription {
        self.inner.sessions_changed.subscribe()
    }

    /// Returns true if a provider is currently registered under `id`.
    pub fn is_provider_registered(&self, id: &ProviderId) -> bool {
        self.inner
            .providers
            .lock()
            .expect("lock poisoned")
            .contains_key(id)
    }

    /// Registers an authentication provider under a unique id.
    ///
    /// Must be called from within a tokio runtime: registration spawns the
    /// task that forwards the provider's change stream.
    pub fn register_authentication_provider(
        &self,
        id: ProviderId,
        label: impl Into<String>,
        provider: Arc<dyn AuthenticationProvider>,
        options: Option<ProviderOptions>,
    ) -> BrokerResult<ProviderRegistrationHandle<S>> {
        let label = label.into();
        {
            let mut providers = self.inner.providers.lock().expect("lock poisoned");
            if providers.contains_key(&id) {
                return Err(BrokerError::ProviderAlreadyRegistered(id));
            }
            let listener = provider.subscribe_changes();
            let forwarder = Self::spawn_change_forwarder(
                Arc::downgrade(&self.inner),
                id.clone(),
                label.clone(),
                listener,
            );
            providers.insert(
                id.clone(),
                ProviderRegistration {
                    label,
                    options: options.unwrap_or_default(),
                    provider,
                    forwarder,
                },
            );
        }

        tracing::info!("broker: registered authentication provider {id}");
        self.inner.sink.emit(ProviderUpdate { id: id.to_string() });
        Ok(ProviderRegistrationHandle {
            inner: Arc::downgrade(&self.inner),
            id,
        })
    }

    fn spawn_change_forwarder(
        inner: Weak<BrokerInner<S>>,
        id: ProviderId,
        label: String,
        mut listener: SessionChangeListener,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while listener.recv().await.is_some() {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                tracing::debug!("broker: provider {id} reported a session change");
                inner.sessions_changed.notify(SessionsChangedEvent {
                    provider: ProviderDescriptor {
                        id: id.clone(),
                        label: label.clone(),
                    },
                });
                inner.sink.emit(ProviderUpdate { id: id.to_string() });
            }
        })
    }

    fn registered_provider(
        &self,
        id: &ProviderId,
    ) -> Option<(Arc<dyn AuthenticationProvider>, String)> {
        let providers = self.inner.providers.lock().expect("lock poisoned");
        providers
            .get(id)
            .map(|r| (r.provider.clone(), r.label.clone()))
    }

    /// Resolves a session for an extension, per the access policy.
    ///
    /// Returns `Ok(None)` for every expected "no result": denied access, a
    /// silent miss, or the user declining a prompt. The session snapshot
    /// taken from the provider at the start of the call is used for the
    /// remainder of the call, even if the provider's sessions change
    /// mid-flight.
    pub async fn get_session(
        &self,
        extension: &ExtensionDescriptor,
        provider_id: &ProviderId,
        scopes: &[String],
        options: GetSessionOptions,
    ) -> BrokerResult<Option<AuthSession>> {
        if options.force_new_session || options.clear_session_preference {
            return Err(BrokerError::UnsupportedOptions);
        }
        if options.create_if_none && options.silent {
            return Err(BrokerError::ConflictingOptions);
        }

        let scopes = normalize_scopes(scopes);
        let registered = self.registered_provider(provider_id);
        let sessions = match &registered {
            Some((provider, _)) => provider.get_sessions(Some(scopes.as_slice())).await?,
            None => Vec::new(),
        };

        // The first session is canonical, even when the provider supports
        // multiple accounts.
        if let Some(session) = sessions.into_iter().next() {
            let provider_label = registered
                .map(|(_, label)| label)
                .unwrap_or_else(|| provider_id.to_string());
            let account_label = session.account.display_label().to_string();

            match self
                .inner
                .allowances
                .is_allowed(provider_id, &session.account.id, &extension.id)
            {
                Some(false) => return Ok(None),
                Some(true) => {}
                None => {
                    if options.silent {
                        return Ok(None);
                    }
                    let choice = self
                        .inner
                        .prompts
                        .show_message_box(MessageBoxRequest {
                            title: "Account access".to_string(),
                            message: format!(
                                "The extension '{}' wants to access the {} account '{}'.",
                                extension.label, provider_label, account_label
                            ),
                            buttons: vec!["Deny".to_string(), "Allow".to_string()],
                            kind: MessageBoxKind::Question,
                        })
                        .await;
                    if choice.response != 1 {
                        // A decline is not persisted; the user is asked
                        // again on the next attempt.
                        return Ok(None);
                    }
                    self.write_allowance(
                        provider_id,
                        &session.account.id,
                        &extension.id,
                        &extension.label,
                        true,
                    );
                }
            }

            self.inner
                .usage
                .record(provider_id, &session.id, &extension.id, &extension.label);
            return Ok(Some(session));
        }

        if options.create_if_none {
            let (provider, provider_label) = registered
                .ok_or_else(|| BrokerError::ProviderNotInstalled(provider_id.clone()))?;
            let choice = self
                .inner
                .prompts
                .show_message_box(MessageBoxRequest {
                    title: "Sign in".to_string(),
                    message: format!(
                        "The extension '{}' wants to sign in using {}.",
                        extension.label, provider_label
                    ),
                    buttons: vec!["Cancel".to_string(), "Allow".to_string()],
                    kind: MessageBoxKind::Question,
                })
                .await;
            if choice.response != 1 {
                return Ok(None);
            }

            let session = provider.create_session(&scopes).await?;
            tracing::info!(
                "broker: created session {} on provider {provider_id} for extension {}",
                session.id,
                extension.id
            );

            self.inner
                .requests
                .remove_for_extension(provider_id, &extension.id);
            self.write_allowance(
                provider_id,
                &session.account.id,
                &extension.id,
                &extension.label,
                true,
            );
            self.inner
                .usage
                .record(provider_id, &session.id, &extension.id, &extension.label);
            return Ok(Some(session));
        }

        if options.silent {
            return Ok(None);
        }

        // Non-interactive miss: queue a sign-in request for the operator
        // menu. A pending duplicate leaves the ledger untouched but still
        // re-notifies the UI.
        match self.inner.requests.queue(provider_id, extension, &scopes) {
            Some(request_id) => {
                tracing::info!("broker: queued session request {request_id}");
            }
            None => {
                tracing::debug!(
                    "broker: session request already pending for extension {} on provider {provider_id}",
                    extension.id
                );
            }
        }
        self.inner.sink.emit(ProviderUpdate {
            id: provider_id.to_string(),
        });
        Ok(None)
    }

    /// Signs a session out after interactive confirmation.
    ///
    /// No-ops silently when the provider is unregistered or the session is
    /// already gone.
    pub async fn sign_out(
        &self,
        provider_id: &ProviderId,
        session_id: &SessionId,
    ) -> BrokerResult<()> {
        let Some((provider, _)) = self.registered_provider(provider_id) else {
            return Ok(());
        };
        let sessions = provider.get_sessions(None).await?;
        let Some(session) = sessions.into_iter().find(|s| &s.id == session_id) else {
            return Ok(());
        };

        let names = self.inner.usage.extension_names(provider_id, session_id);
        let noun = if names.len() == 1 {
            "this extension"
        } else {
            "these extensions"
        };
        let choice = self
            .inner
            .prompts
            .show_message_box(MessageBoxRequest {
                title: "Sign out".to_string(),
                message: format!(
                    "The account '{}' has been used by: {}. Sign out from {}?",
                    session.account.display_label(),
                    names.join(", "),
                    noun
                ),
                buttons: vec!["Cancel".to_string(), "Sign Out".to_string()],
                kind: MessageBoxKind::Question,
            })
            .await;
        if choice.response != 1 {
            return Ok(());
        }

        provider.remove_session(session_id).await?;
        self.inner.usage.purge(provider_id, session_id);
        tracing::info!("broker: signed out session {session_id} on provider {provider_id}");
        Ok(())
    }

    /// Projects every registered provider for the UI.
    ///
    /// Pending sign-in requests are surfaced only while the provider has
    /// zero sessions; they become actionable again once all sessions are
    /// gone.
    pub async fn get_authentication_providers_info(&self) -> BrokerResult<Vec<ProviderInfo>> {
        let snapshot = self.provider_snapshot();

        let mut infos = Vec::with_capacity(snapshot.len());
        for (id, label, options, provider) in snapshot {
            let sessions = provider.get_sessions(None).await?;
            let accounts = sessions
                .iter()
                .map(|s| ProviderAccount {
                    account_id: s.account.id.to_string(),
                    account_label: s.account.display_label().to_string(),
                })
                .collect();
            let session_requests = if sessions.is_empty() {
                self.inner
                    .requests
                    .for_provider(&id)
                    .into_iter()
                    .map(Into::into)
                    .collect()
            } else {
                Vec::new()
            };
            infos.push(ProviderInfo {
                id: id.to_string(),
                label,
                accounts,
                supports_multiple_accounts: options.supports_multiple_accounts,
                images: options.images,
                session_requests,
            });
        }
        Ok(infos)
    }

    /// Returns every pending sign-in request.
    pub fn get_session_requests(&self) -> Vec<SessionRequestInfo> {
        self.inner.requests.all().into_iter().map(Into::into).collect()
    }

    /// Fulfils a pending sign-in request interactively.
    ///
    /// On success every pending request for that provider is cleared, not
    /// just the executed one: the provider can now supply a session to
    /// satisfy them all.
    pub async fn execute_session_request(&self, request_id: &str) -> BrokerResult<()> {
        let request = self
            .inner
            .requests
            .get(request_id)
            .ok_or_else(|| BrokerError::RequestNotFound(request_id.to_string()))?;
        let Some((provider, _)) = self.registered_provider(&request.provider_id) else {
            return Err(BrokerError::ProviderNotInstalled(request.provider_id));
        };

        let session = provider.create_session(&request.scopes).await?;
        tracing::info!(
            "broker: session request {request_id} fulfilled by session {}",
            session.id
        );
        self.inner.requests.clear_provider(&request.provider_id);
        Ok(())
    }

    /// Dismisses a pending sign-in request without signing in.
    pub fn cancel_session_request(&self, request_id: &str) -> BrokerResult<()> {
        let request = self
            .inner
            .requests
            .remove(request_id)
            .ok_or_else(|| BrokerError::RequestNotFound(request_id.to_string()))?;
        tracing::info!("broker: cancelled session request {request_id}");
        self.inner.sink.emit(ProviderUpdate {
            id: request.provider_id.to_string(),
        });
        Ok(())
    }

    /// Returns the full allowance list for a (provider, account) bucket.
    pub fn read_allowed_extensions(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
    ) -> Vec<AllowedExtension> {
        self.inner.allowances.read(provider_id, account_id)
    }

    /// Upserts one extension's access decision for an account.
    ///
    /// Unlike the interactive prompt path, this writes `false` records too
    /// (an explicit revoke), which stick until changed.
    pub fn update_allowed_extension(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
        extension_id: &ExtensionId,
        extension_name: &str,
        allowed: bool,
    ) {
        self.write_allowance(provider_id, account_id, extension_id, extension_name, allowed);
    }

    /// Tri-state access check: `Some(decision)` when one exists, `None`
    /// when undecided. Undecided and denied trigger different control flow
    /// (prompt vs. immediate refusal) — never collapse the two.
    pub fn is_access_allowed(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
        extension_id: &ExtensionId,
    ) -> Option<bool> {
        self.inner
            .allowances
            .is_allowed(provider_id, account_id, extension_id)
    }

    /// Composes the accounts menu: one sign-in entry per pending request,
    /// one account entry per (provider, account) pair currently known.
    pub async fn get_accounts_menu_info(&self) -> BrokerResult<Vec<AccountsMenuEntry>> {
        let mut entries = Vec::new();

        for request in self.inner.requests.all() {
            let provider_label = {
                let providers = self.inner.providers.lock().expect("lock poisoned");
                providers.get(&request.provider_id).map(|r| r.label.clone())
            }
            .unwrap_or_else(|| request.provider_id.to_string());
            entries.push(AccountsMenuEntry::SignInRequest {
                request_id: request.request_id.clone(),
                label: format!(
                    "Sign in with {provider_label} to use {}",
                    request.extension_label
                ),
            });
        }

        let mut seen = HashSet::new();
        for (id, label, _, provider) in self.provider_snapshot() {
            let sessions = provider.get_sessions(None).await?;
            for session in sessions {
                if seen.insert((id.clone(), session.account.id.clone())) {
                    entries.push(AccountsMenuEntry::Account {
                        provider_id: id.to_string(),
                        account_id: session.account.id.to_string(),
                        label: format!("{} ({label})", session.account.display_label()),
                    });
                }
            }
        }
        Ok(entries)
    }

    /// Stable-ordered snapshot of the registry, taken without holding the
    /// lock across provider calls.
    fn provider_snapshot(
        &self,
    ) -> Vec<(
        ProviderId,
        String,
        ProviderOptions,
        Arc<dyn AuthenticationProvider>,
    )> {
        let providers = self.inner.providers.lock().expect("lock poisoned");
        let mut entries: Vec<_> = providers
            .iter()
            .map(|(id, r)| {
                (
                    id.clone(),
                    r.label.clone(),
                    r.options.clone(),
                    r.provider.clone(),
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        entries
    }

    fn write_allowance(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
        extension_id: &ExtensionId,
        extension_name: &str,
        allowed: bool,
    ) {
        self.inner
            .allowances
            .upsert(provider_id, account_id, extension_id, extension_name, allowed);
        self.inner.sink.emit(ProviderUpdate {
            id: provider_id.to_string(),
        });
    }

    #[cfg(test)]
    pub(crate) fn usage_ledger(&self) -> &AccountUsageLedger {
        &self.inner.usage
    }
}
