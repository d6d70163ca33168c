//! Passwordless wallet authentication.
//!
//! Flow:
//! 1. Start a local HTTP server for the callback on a random port
//! 2. Open the system browser on the hosted login page with the callback URL
//! 3. The page runs the passwordless login and POSTs the result back
//! 4. Parse the result; the session provider persists the user address
//!
//! After login every wallet operation (sending a transaction, signing a
//! message) is relayed to the hosted service; keys never touch this process.

mod callback_flow;
mod hosted;
mod persistence;

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::chain::TransactionRequest;
use crate::error::Result;

pub use callback_flow::run_auth_callback_server;
pub use hosted::HostedAuthClient;
pub use persistence::{FileKvStore, KvStore, MemoryKvStore, DID_TOKEN_KEY, USER_KEY};

/// Login result posted back by the hosted auth page.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub did_token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "state")]
    pub callback_state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the hosted passwordless wallet. Calls block on network I/O;
/// async callers go through `smol::unblock`.
pub trait AuthClient: Send + Sync {
    /// Interactive login. Returns the address of the user's wallet.
    fn login(&self) -> Result<Address>;
    fn is_logged_in(&self) -> Result<bool>;
    fn logout(&self) -> Result<()>;
    /// Sign and broadcast a transaction from the user's wallet.
    fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256>;
    /// EIP-191 personal signature over `message`; 65 bytes r||s||v.
    fn sign_message(&self, message: &[u8]) -> Result<Bytes>;

    /// Credential to persist so a later process can [`resume`](Self::resume).
    fn did_token(&self) -> Option<String> {
        None
    }

    /// Adopt credentials persisted by an earlier login.
    fn resume(&self, _address: Address, _did_token: String) {}
}

/// An authenticated user. Read-only to everything except the session provider.
#[derive(Clone)]
pub struct Session {
    wallet: Arc<dyn AuthClient>,
    is_logged_in: bool,
    user_address: Address,
}

impl Session {
    pub fn new(wallet: Arc<dyn AuthClient>, user_address: Address) -> Self {
        Self {
            wallet,
            is_logged_in: true,
            user_address,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn user_address(&self) -> Address {
        self.user_address
    }

    /// Handle to the signer behind this session.
    pub fn wallet(&self) -> &Arc<dyn AuthClient> {
        &self.wallet
    }

    pub(crate) fn mark_logged_out(&mut self) {
        self.is_logged_in = false;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("is_logged_in", &self.is_logged_in)
            .field("user_address", &self.user_address)
            .finish_non_exhaustive()
    }
}

pub(crate) fn short_hex(value: &str) -> String {
    let count = value.chars().count();
    if count <= 14 {
        return value.to_string();
    }
    let head: String = value.chars().take(8).collect();
    let tail: String = value.chars().skip(count - 6).collect();
    format!("{head}...{tail}")
}

pub fn log_auth_result(context: &str, result: &AuthResult) {
    log::info!(
        "[Auth] {}: wallet_address={:?}, email={:?}, did_token={}, error={:?}",
        context,
        result.wallet_address,
        result.email,
        result
            .did_token
            .as_deref()
            .map(short_hex)
            .unwrap_or_else(|| "-".to_string()),
        result.error
    );
}
