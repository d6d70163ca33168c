//! Panel state for the wallet screen: account info and the two send forms.
//! Panels hold presentation state only; every chain or wallet call goes
//! through the session's clients or the smart-account handle.

mod account_info;
mod clipboard;
mod draft;
mod send_aa_transaction;
mod send_transaction;

use alloy_primitives::B256;

use crate::error::{Result, WalletError};
use crate::polling::CancelToken;
use crate::status_center::{self, SharedStatus};

pub use account_info::{
    AccountInfoPanel, BalanceDisplay, COPIED_LABEL, COPY_LABEL, FETCHING_ADDRESS,
};
pub use clipboard::{Clipboard, MemoryClipboard, TerminalClipboard};
pub use draft::{field_error, TransactionDraft};
pub use send_aa_transaction::SendAaTransactionPanel;
pub use send_transaction::SendTransactionPanel;

/// In-flight bookkeeping shared by the send panels.
struct Submission {
    key: &'static str,
    in_flight: bool,
    pending_hash: Option<B256>,
    last_error: Option<String>,
    cancel: CancelToken,
    status: SharedStatus,
}

impl Submission {
    fn new(key: &'static str, status: SharedStatus) -> Self {
        Self {
            key,
            in_flight: false,
            pending_hash: None,
            last_error: None,
            cancel: CancelToken::new(),
            status,
        }
    }

    /// Mark a submission as started. Fails with `Busy` while one is running.
    /// A token cancelled while idle is replaced so it cannot abort the new send.
    fn begin(&mut self) -> Result<CancelToken> {
        if self.in_flight {
            return Err(WalletError::Busy);
        }
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
        self.in_flight = true;
        self.pending_hash = None;
        self.last_error = None;
        Ok(self.cancel.clone())
    }

    /// Stop waiting for the running send's receipt. No-op while idle.
    fn cancel(&self) {
        if self.in_flight {
            self.cancel.cancel();
        } else {
            log::debug!("[Send] {}: nothing in flight to cancel", self.key);
        }
    }

    fn record_pending(&mut self, hash: B256, message: String) {
        self.pending_hash = Some(hash);
        status_center::publish(&self.status, |s| s.publish_progress(self.key, message));
    }

    /// Clear the in-flight flag; a cancelled token is replaced so the next
    /// send can be cancelled on its own.
    fn settle(&mut self) {
        self.in_flight = false;
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
    }

    fn succeed(&mut self, message: String) {
        self.settle();
        status_center::publish(&self.status, |s| s.publish_success(self.key, message));
    }

    fn fail(&mut self, err: &WalletError) {
        self.settle();
        log::error!("[Send] {} failed: {}", self.key, err);
        self.last_error = Some(err.to_string());
        status_center::publish(&self.status, |s| {
            s.publish_error(self.key, format!("Transaction failed: {err}"))
        });
    }

    /// Flag a validation failure without touching the in-flight state.
    fn reject(&mut self, err: &WalletError) {
        self.last_error = Some(err.to_string());
    }
}

impl Drop for Submission {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
