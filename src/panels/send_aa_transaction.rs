use std::sync::Arc;

use alloy_primitives::{B256, U256};

use super::{Submission, TransactionDraft};
use crate::error::{Result, WalletError};
use crate::network::Network;
use crate::polling::{spawn_poll, CancelToken, PollConfig};
use crate::shared::units::format_ether_trimmed;
use crate::smart_account::{Call, SmartAccount, UserOperationReceipt};
use crate::status_center::SharedStatus;

/// Native transfer sent as a sponsored user operation from the smart account.
pub struct SendAaTransactionPanel {
    network: Network,
    poll: PollConfig,
    pub draft: TransactionDraft,
    submission: Submission,
    last_receipt: Option<UserOperationReceipt>,
}

impl SendAaTransactionPanel {
    pub fn new(network: Network, poll: PollConfig, status: SharedStatus) -> Self {
        Self {
            network,
            poll,
            draft: TransactionDraft::default(),
            submission: Submission::new("send.aa", status),
            last_receipt: None,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.submission.in_flight
    }

    pub fn can_submit(&self, account_ready: bool) -> bool {
        account_ready && !self.submission.in_flight && !self.draft.is_empty()
    }

    pub fn pending_hash(&self) -> Option<B256> {
        self.submission.pending_hash
    }

    pub fn last_error(&self) -> Option<&str> {
        self.submission.last_error.as_deref()
    }

    pub fn last_receipt(&self) -> Option<&UserOperationReceipt> {
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

    pub async fn send(
        &mut self,
        account: Option<&Arc<dyn SmartAccount>>,
    ) -> Result<UserOperationReceipt> {
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
        let Some(account) = account.cloned() else {
            let err = WalletError::SmartAccountUnavailable;
            self.submission.reject(&err);
            return Err(err);
        };

        let token = self.submission.begin()?;
        let result = self.submit(account, vec![Call::transfer(to, value)], token).await;
        match &result {
            Ok(receipt) => {
                self.submission.succeed(format!(
                    "User operation confirmed: {}",
                    self.network
                        .explorer_tx_url(receipt.receipt.transaction_hash)
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
        account: Arc<dyn SmartAccount>,
        calls: Vec<Call>,
        token: CancelToken,
    ) -> Result<UserOperationReceipt> {
        let total = calls
            .iter()
            .fold(U256::ZERO, |acc, c| acc.saturating_add(c.value));
        log::info!(
            "[Send] user operation: {} call(s), {} {} from {}",
            calls.len(),
            format_ether_trimmed(total),
            self.network.token(),
            account.address()
        );

        let submitter = Arc::clone(&account);
        let hash = smol::unblock(move || submitter.submit(&calls)).await?;
        self.submission.record_pending(
            hash,
            format!("User operation {hash} sent, waiting for inclusion..."),
        );

        let receipt = spawn_poll(hash.to_string(), self.poll, token, move || {
            account.user_operation_receipt(hash)
        })
        .wait()
        .await?;

        if !receipt.success {
            return Err(WalletError::UserOperationFailed {
                hash: hash.to_string(),
                reason: receipt
                    .reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            });
        }
        log::info!(
            "[Send] user operation {} included in {}",
            hash,
            receipt.receipt.transaction_hash
        );
        Ok(receipt)
    }
}
