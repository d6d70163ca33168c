use std::sync::Arc;

use alloy_primitives::B256;

use super::{Submission, TransactionDraft};
use crate::auth::Session;
use crate::chain::{ChainClient, TransactionReceipt, TransactionRequest};
use crate::error::{Result, WalletError};
use crate::network::Network;
use crate::polling::{spawn_poll, CancelToken, PollConfig};
use crate::shared::units::format_ether_trimmed;
use crate::status_center::SharedStatus;

/// Native transfer signed by the session wallet itself.
pub struct SendTransactionPanel {
    network: Network,
    poll: PollConfig,
    pub draft: TransactionDraft,
    submission: Submission,
    last_receipt: Option<TransactionReceipt>,
}

impl SendTransactionPanel {
    pub fn new(network: Network, poll: PollConfig, status: SharedStatus) -> Self {
        Self {
            network,
            poll,
            draft: TransactionDraft::default(),
            submission: Submission::new("send.eoa", status),
            last_receipt: None,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.submission.in_flight
    }

    pub fn can_submit(&self) -> bool {
        !self.submission.in_flight && !self.draft.is_empty()
    }

    pub fn pending_hash(&self) -> Option<B256> {
        self.submission.pending_hash
    }

    pub fn last_error(&self) -> Option<&str> {
        self.submission.last_error.as_deref()
    }

    pub fn last_receipt(&self) -> Option<&TransactionReceipt> {
        self.last_receipt.as_ref()
    }

    /// Token that stops the receipt poll of the running send. Cancelling it
    /// before a send starts does not affect that send.
    pub fn cancel_token(&self) -> CancelToken {
        self.submission.cancel.clone()
    }

    pub fn cancel(&self) {
        self.submission.cancel();
    }

    /// Validate the draft, send it from the session wallet and wait for the
    /// receipt.
    pub async fn send(
        &mut self,
        session: Option<&Session>,
        chain: Option<Arc<dyn ChainClient>>,
    ) -> Result<TransactionReceipt> {
        if self.submission.in_flight {
            return Err(WalletError::Busy);
        }
        let (to, value) = match self.draft.validate() {
            Ok(parsed) => parsed,
            Err(err) => {
                self.submission.reject(&err);
                return Err(err);
            }
        };
        let (session, chain) = match (session.filter(|s| s.is_logged_in()), chain) {
            (Some(session), Some(chain)) => (session, chain),
            (None, _) => {
                self.submission.reject(&WalletError::NotLoggedIn);
                return Err(WalletError::NotLoggedIn);
            }
            (_, None) => {
                let err = WalletError::NotConfigured("chain RPC client");
                self.submission.reject(&err);
                return Err(err);
            }
        };

        let token = self.submission.begin()?;
        let tx = TransactionRequest {
            from: session.user_address(),
            to,
            value,
            gas_price: None,
        };
        let result = self.submit(session, chain, tx, token).await;
        match &result {
            Ok(receipt) => {
                self.submission.succeed(format!(
                    "Transaction confirmed: {}",
                    self.network.explorer_tx_url(receipt.transaction_hash)
                ));
                self.last_receipt = Some(receipt.clone());
                self.draft.clear();
            }
            Err(err) => self.submission.fail(err),
        }
        result
    }

    async fn submit(
        &mut self,
        session: &Session,
        chain: Arc<dyn ChainClient>,
        mut tx: TransactionRequest,
        token: CancelToken,
    ) -> Result<TransactionReceipt> {
        if !self.network.is_eip1559_supported() {
            let reader = Arc::clone(&chain);
            let gas_price = smol::unblock(move || reader.gas_price()).await?;
            log::debug!("[Send] legacy gas price {} for {}", gas_price, self.network.name());
            tx.gas_price = Some(gas_price);
        }

        log::info!(
            "[Send] sending {} {} from {} to {}",
            format_ether_trimmed(tx.value),
            self.network.token(),
            tx.from,
            tx.to
        );
        let wallet = Arc::clone(session.wallet());
        let hash = smol::unblock(move || wallet.send_transaction(&tx)).await?;
        self.submission
            .record_pending(hash, format!("Transaction {hash} submitted, waiting for receipt..."));

        let receipt = spawn_poll(hash.to_string(), self.poll, token, move || {
            chain.transaction_receipt(hash)
        })
        .wait()
        .await?;
        if !receipt.succeeded() {
            return Err(WalletError::TransactionReverted {
                hash: hash.to_string(),
            });
        }
        log::info!(
            "[Send] confirmed {} in block {:?}",
            hash,
            receipt.block_number
        );
        Ok(receipt)
    }
}
