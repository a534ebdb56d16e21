//! Integration tests for the authentication broker.
//!
//! Organized per concern:
//!
//! - `dedup.rs`        - session request deduplication
//! - `allowances.rs`   - access prompts and the allowance store
//! - `creation.rs`     - interactive session creation
//! - `sign_out.rs`     - sign-out confirmation and purging
//! - `registration.rs` - provider lifecycle and change forwarding
//! - `info.rs`         - UI projections and the operator request surface
//! - `concurrency.rs`  - racing calls and in-flight snapshots

mod dedup;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::prompt::{PromptGateway, QueuedPrompt};
use crate::provider::{AuthenticationProvider, SessionChangeListener};
use crate::types::{
    AccountDescriptor, AccountId, AuthSession, ExtensionDescriptor, GetSessionOptions, ProviderId,
    SessionId,
};
use crate::update_sink::RecordingSink;
use crate::{AuthenticationBroker, ProviderRegistrationHandle};

/// Scriptable in-memory provider.
pub struct FakeProvider {
    sessions: Mutex<Vec<AuthSession>>,
    next_account: Mutex<AccountDescriptor>,
    created_scopes: Mutex<Vec<Vec<String>>>,
    removed: Mutex<Vec<SessionId>>,
    fail_next_create: AtomicBool,
    minted: AtomicUsize,
    change_senders: Mutex<Vec<UnboundedSender<()>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            next_account: Mutex::new(AccountDescriptor {
                id: AccountId::from_string("a1"),
                label: "Alice".to_string(),
            }),
            created_scopes: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            fail_next_create: AtomicBool::new(false),
            minted: AtomicUsize::new(0),
            change_senders: Mutex::new(Vec::new()),
        }
    }

    /// Sets the account the next created session belongs to.
    pub fn set_next_account(&self, id: &str, label: &str) {
        *self.next_account.lock().unwrap() = AccountDescriptor {
            id: AccountId::from_string(id),
            label: label.to_string(),
        };
    }

    pub fn push_session(&self, session: AuthSession) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn clear_sessions(&self) {
        self.sessions.lock().unwrap().clear();
    }

    pub fn created_scopes(&self) -> Vec<Vec<String>> {
        self.created_scopes.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<SessionId> {
        self.removed.lock().unwrap().clone()
    }

    /// Makes the next create_session call reject.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Fires the provider's session-change event.
    pub fn fire_change(&self) {
        self.change_senders
            .lock()
            .unwrap()
            .retain(|sender| sender.send(()).is_ok());
    }
}

#[async_trait]
impl AuthenticationProvider for FakeProvider {
    async fn get_sessions(&self, _scopes: Option<&[String]>) -> anyhow::Result<Vec<AuthSession>> {
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn create_session(&self, scopes: &[String]) -> anyhow::Result<AuthSession> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            anyhow::bail!("sign-in window closed");
        }
        self.created_scopes.lock().unwrap().push(scopes.to_vec());
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        let session = AuthSession {
            id: SessionId::from_string(format!("session-{n}")),
            access_token: format!("token-{n}"),
            account: self.next_account.lock().unwrap().clone(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn remove_session(&self, session_id: &SessionId) -> anyhow::Result<()> {
        self.removed.lock().unwrap().push(session_id.clone());
        self.sessions.lock().unwrap().retain(|s| &s.id != session_id);
        Ok(())
    }

    fn subscribe_changes(&self) -> SessionChangeListener {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.change_senders.lock().unwrap().push(sender);
        receiver
    }
}

/// Broker wired to a scripted prompt and a recording sink.
pub fn make_broker() -> (AuthenticationBroker<RecordingSink>, Arc<QueuedPrompt>) {
    let prompts = Arc::new(QueuedPrompt::new());
    let broker = AuthenticationBroker::new(prompts.clone(), RecordingSink::new());
    (broker, prompts)
}

/// Broker wired to an arbitrary prompt gateway and a recording sink.
pub fn broker_with_prompts<P: PromptGateway + 'static>(
    prompts: Arc<P>,
) -> AuthenticationBroker<RecordingSink> {
    AuthenticationBroker::new(prompts, RecordingSink::new())
}

/// Registers a fresh fake provider under `id`.
pub fn register(
    broker: &AuthenticationBroker<RecordingSink>,
    id: &str,
    label: &str,
) -> (
    Arc<FakeProvider>,
    ProviderRegistrationHandle<RecordingSink>,
) {
    let provider = Arc::new(FakeProvider::new());
    let handle = broker
        .register_authentication_provider(
            ProviderId::from_string(id),
            label,
            provider.clone(),
            None,
        )
        .unwrap();
    (provider, handle)
}

pub fn ext(id: &str, label: &str) -> ExtensionDescriptor {
    ExtensionDescriptor::new(id, label)
}

pub fn pid(id: &str) -> ProviderId {
    ProviderId::from_string(id)
}

pub fn scopes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn session(id: &str, account_id: &str, account_label: &str) -> AuthSession {
    AuthSession {
        id: SessionId::from_string(id),
        access_token: format!("token-for-{id}"),
        account: AccountDescriptor {
            id: AccountId::from_string(account_id),
            label: account_label.to_string(),
        },
    }
}

pub fn create_if_none() -> GetSessionOptions {
    GetSessionOptions {
        create_if_none: true,
        ..Default::default()
    }
}

pub fn silent() -> GetSessionOptions {
    GetSessionOptions {
        silent: true,
        ..Default::default()
    }
}
