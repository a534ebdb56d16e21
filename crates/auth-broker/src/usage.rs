//! The account usage ledger.
//!
//! Records which extensions actually consumed which (provider, session)
//! pair. The only consumer is the sign-out confirmation, which lists the
//! extensions that used the account being signed out. Rows are additive
//! during normal operation and purged wholesale on successful sign-out.

use std::sync::Mutex;

use crate::types::{ExtensionId, ProviderId, SessionId};

/// One observation of an extension consuming a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUsageRecord {
    pub provider_id: ProviderId,
    pub session_id: SessionId,
    pub extension_id: ExtensionId,
    pub extension_name: String,
}

/// Ledger of session consumption, one row per distinct
/// (provider, session, extension) triple ever observed.
#[derive(Debug, Default)]
pub struct AccountUsageLedger {
    records: Mutex<Vec<AccountUsageRecord>>,
}

impl AccountUsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a consumption. Idempotent: an existing row for the same
    /// triple is left untouched (including its name).
    pub fn record(
        &self,
        provider_id: &ProviderId,
        session_id: &SessionId,
        extension_id: &ExtensionId,
        extension_name: &str,
    ) {
        let mut records = self.records.lock().expect("lock poisoned");
        let exists = records.iter().any(|r| {
            &r.provider_id == provider_id
                && &r.session_id == session_id
                && &r.extension_id == extension_id
        });
        if !exists {
            records.push(AccountUsageRecord {
                provider_id: provider_id.clone(),
                session_id: session_id.clone(),
                extension_id: extension_id.clone(),
                extension_name: extension_name.to_string(),
            });
        }
    }

    /// Returns the names of the extensions that used a session.
    pub fn extension_names(&self, provider_id: &ProviderId, session_id: &SessionId) -> Vec<String> {
        let records = self.records.lock().expect("lock poisoned");
        records
            .iter()
            .filter(|r| &r.provider_id == provider_id && &r.session_id == session_id)
            .map(|r| r.extension_name.clone())
            .collect()
    }

    /// Removes every row for a (provider, session) pair.
    pub fn purge(&self, provider_id: &ProviderId, session_id: &SessionId) {
        let mut records = self.records.lock().expect("lock poisoned");
        records.retain(|r| !(&r.provider_id == provider_id && &r.session_id == session_id));
    }

    /// Returns all rows, for inspection.
    pub fn records(&self) -> Vec<AccountUsageRecord> {
        self.records.lock().expect("lock poisoned").clone()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.records.lock().expect("lock poisoned").len()
    }

    /// Returns true if the ledger holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
