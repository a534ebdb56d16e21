//! The access allowance store.
//!
//! Durable-in-process decisions about which extensions may read which
//! accounts' sessions. The unit of trust is the **account**, not the
//! provider: one provider can host multiple accounts, each with its own
//! allowance bucket.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::{AccountId, ExtensionId, ProviderId};

/// One extension's recorded decision within a (provider, account) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedExtension {
    pub extension_id: ExtensionId,
    pub extension_name: String,
    pub allowed: bool,
}

/// In-process store of (provider, account) → extension allowances.
///
/// Absence of an entry is load-bearing: an undecided extension triggers a
/// prompt, a recorded `false` refuses immediately. The interactive prompt
/// path only ever writes `true` — a user's "Deny" leaves the entry absent
/// so the question is asked again next time.
#[derive(Debug, Default)]
pub struct AllowanceStore {
    buckets: Mutex<HashMap<String, Vec<AllowedExtension>>>,
}

impl AllowanceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_key(provider_id: &ProviderId, account_id: &AccountId) -> String {
        format!("{provider_id}:{account_id}")
    }

    /// Returns the full allowance list for a bucket, or empty if none
    /// exists.
    pub fn read(&self, provider_id: &ProviderId, account_id: &AccountId) -> Vec<AllowedExtension> {
        let buckets = self.buckets.lock().expect("lock poisoned");
        buckets
            .get(&Self::bucket_key(provider_id, account_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Upserts one extension's decision within a bucket.
    ///
    /// At most one entry per extension id; re-deciding overwrites in place.
    pub fn upsert(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
        extension_id: &ExtensionId,
        extension_name: &str,
        allowed: bool,
    ) {
        let mut buckets = self.buckets.lock().expect("lock poisoned");
        let bucket = buckets
            .entry(Self::bucket_key(provider_id, account_id))
            .or_default();

        match bucket.iter_mut().find(|e| &e.extension_id == extension_id) {
            Some(entry) => {
                entry.extension_name = extension_name.to_string();
                entry.allowed = allowed;
            }
            None => bucket.push(AllowedExtension {
                extension_id: extension_id.clone(),
                extension_name: extension_name.to_string(),
                allowed,
            }),
        }
    }

    /// Tri-state lookup: `Some(decision)` when one exists, `None` when the
    /// bucket or the extension entry is absent.
    pub fn is_allowed(
        &self,
        provider_id: &ProviderId,
        account_id: &AccountId,
        extension_id: &ExtensionId,
    ) -> Option<bool> {
        let buckets = self.buckets.lock().expect("lock poisoned");
        buckets
            .get(&Self::bucket_key(provider_id, account_id))?
            .iter()
            .find(|e| &e.extension_id == extension_id)
            .map(|e| e.allowed)
    }
}
