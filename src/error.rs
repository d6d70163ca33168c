use std::time::Duration;

use thiserror::Error;

/// Field-level validation failure for a transaction draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid amount")]
    InvalidAmount,
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("no active session; log in first")]
    NotLoggedIn,

    #[error("smart account is not connected")]
    SmartAccountUnavailable,

    #[error(transparent)]
    Validation(#[from] DraftError),

    #[error("a submission is already in flight")]
    Busy,

    #[error("a user operation needs at least one call")]
    EmptyBatch,

    #[error("HTTP request failed ({url}): {detail}")]
    Http { url: String, detail: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("auth failed: {0}")]
    Auth(String),

    #[error("{hash} still pending after {waited:?}")]
    ReceiptTimeout { hash: String, waited: Duration },

    #[error("receipt polling cancelled")]
    Cancelled,

    #[error("transaction {hash} reverted")]
    TransactionReverted { hash: String },

    #[error("user operation {hash} failed: {reason}")]
    UserOperationFailed { hash: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;

impl WalletError {
    pub(crate) fn decode(detail: impl Into<String>) -> Self {
        Self::Decode(detail.into())
    }
}
