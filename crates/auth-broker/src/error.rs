//! Error types for the authentication broker.

use crate::types::ProviderId;
use thiserror::Error;

/// Convenience alias for broker results.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors from the authentication broker.
///
/// Every variant except [`BrokerError::Provider`] is a contract violation by
/// the caller and is reported before any ledger mutation or provider call.
/// Expected "no result" outcomes (denied access, silent misses, declined
/// prompts) are never errors; they surface as `Ok(None)` or no-ops.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("authentication provider {0} is already registered")]
    ProviderAlreadyRegistered(ProviderId),

    #[error("authentication provider {0} is not installed")]
    ProviderNotInstalled(ProviderId),

    #[error("authentication session request {0} is not found")]
    RequestNotFound(String),

    #[error("get_session options force_new_session and clear_session_preference are not supported")]
    UnsupportedOptions,

    #[error("get_session options create_if_none and silent are mutually exclusive")]
    ConflictingOptions,

    /// A provider call rejected. Propagated unchanged; the broker does not
    /// retry on behalf of the caller.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}
