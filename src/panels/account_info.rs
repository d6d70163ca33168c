use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::U256;
use futures_lite::future;

use super::clipboard::Clipboard;
use crate::auth::Session;
use crate::chain::ChainClient;
use crate::error::{Result, WalletError};
use crate::network::Network;
use crate::session::SessionProvider;
use crate::shared::address::abbreviate_address;
use crate::shared::units::balance_display_text;
use crate::smart_account::SmartAccount;
use crate::status_center::{self, SharedStatus};

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";
pub const FETCHING_ADDRESS: &str = "Fetching address..";
const LOADING: &str = "...";
const COPY_RESET: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BalanceDisplay {
    #[default]
    Loading,
    Loaded(U256),
}

impl BalanceDisplay {
    pub fn text(&self) -> String {
        match self {
            Self::Loading => LOADING.to_string(),
            Self::Loaded(wei) => balance_display_text(*wei),
        }
    }

    /// `text()` followed by the token symbol once loaded.
    pub fn text_in(&self, token: &str) -> String {
        match self {
            Self::Loading => LOADING.to_string(),
            Self::Loaded(_) => format!("{} {token}", self.text()),
        }
    }
}

/// Network status, both addresses and their balances.
pub struct AccountInfoPanel {
    network: Network,
    chain: Option<Arc<dyn ChainClient>>,
    session: Option<Session>,
    account: Option<Arc<dyn SmartAccount>>,
    user_balance: BalanceDisplay,
    account_balance: BalanceDisplay,
    refreshed_once: bool,
    copied_at: Option<Instant>,
    clipboard: Arc<dyn Clipboard>,
    status: SharedStatus,
}

impl AccountInfoPanel {
    pub fn new(network: Network, clipboard: Arc<dyn Clipboard>, status: SharedStatus) -> Self {
        Self {
            network,
            chain: None,
            session: None,
            account: None,
            user_balance: BalanceDisplay::Loading,
            account_balance: BalanceDisplay::Loading,
            refreshed_once: false,
            copied_at: None,
            clipboard,
            status,
        }
    }

    pub fn set_chain_client(&mut self, chain: Option<Arc<dyn ChainClient>>) {
        self.chain = chain;
    }

    pub fn set_session(&mut self, session: Option<Session>) {
        let changed = self.session.as_ref().map(Session::user_address)
            != session.as_ref().map(Session::user_address);
        self.session = session;
        if changed {
            self.user_balance = BalanceDisplay::Loading;
            self.account_balance = BalanceDisplay::Loading;
            self.refreshed_once = false;
        }
    }

    pub fn set_smart_account(&mut self, account: Option<Arc<dyn SmartAccount>>) {
        let changed = self.account.as_ref().map(|a| a.address())
            != account.as_ref().map(|a| a.address());
        self.account = account;
        if changed {
            self.account_balance = BalanceDisplay::Loading;
        }
    }

    pub fn network_status(&self) -> String {
        format!("Connected to {}", self.network.name())
    }

    pub fn user_address_text(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|s| s.user_address().to_checksum(None))
    }

    pub fn smart_account_text(&self) -> String {
        self.account
            .as_ref()
            .map(|a| a.address().to_checksum(None))
            .unwrap_or_else(|| FETCHING_ADDRESS.to_string())
    }

    pub fn user_balance(&self) -> BalanceDisplay {
        self.user_balance
    }

    pub fn account_balance(&self) -> BalanceDisplay {
        self.account_balance
    }

    pub fn user_balance_text(&self) -> String {
        self.user_balance.text_in(self.network.token())
    }

    pub fn account_balance_text(&self) -> String {
        self.account_balance.text_in(self.network.token())
    }

    /// Faucet link, testnets only.
    pub fn faucet_text(&self) -> Option<String> {
        self.network
            .faucet_url()
            .map(|url| format!("Get Test {}: {url}", self.network.token()))
    }

    pub fn copy_label(&self) -> &'static str {
        self.copy_label_at(Instant::now())
    }

    pub fn copy_label_at(&self, now: Instant) -> &'static str {
        match self.copied_at {
            Some(at) if now.saturating_duration_since(at) < COPY_RESET => COPIED_LABEL,
            _ => COPY_LABEL,
        }
    }

    /// Read both balances concurrently. Each one updates on its own; the first
    /// failure is returned after both reads finish.
    pub async fn refresh(&mut self) -> Result<()> {
        let Some(chain) = self.chain.clone() else {
            log::debug!("[Wallet] refresh skipped: no chain client yet");
            return Ok(());
        };

        let user_read = self.session.as_ref().map(|s| {
            let address = s.user_address();
            smol::unblock(move || chain.balance(address))
        });
        let account_read = self.account.clone().map(|account| {
            smol::unblock(move || account.balance())
        });

        let (user, account) = future::zip(
            async {
                match user_read {
                    Some(task) => Some(task.await),
                    None => None,
                }
            },
            async {
                match account_read {
                    Some(task) => Some(task.await),
                    None => None,
                }
            },
        )
        .await;

        let mut first_error: Option<WalletError> = None;
        if let Some(result) = user {
            match result {
                Ok(wei) => self.user_balance = BalanceDisplay::Loaded(wei),
                Err(err) => {
                    log::warn!("[Wallet] user balance fetch failed: {}", err);
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(result) = account {
            match result {
                Ok(wei) => self.account_balance = BalanceDisplay::Loaded(wei),
                Err(err) => {
                    log::warn!("[Wallet] smart account balance fetch failed: {}", err);
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// First refresh after a chain client is available. Returns whether a
    /// refresh ran.
    pub async fn refresh_once(&mut self) -> Result<bool> {
        if self.refreshed_once || self.chain.is_none() {
            return Ok(false);
        }
        self.refreshed_once = true;
        self.refresh().await.map(|_| true)
    }

    pub fn copy(&mut self) -> Result<()> {
        self.copy_at(Instant::now())
    }

    /// Copy the session address. Ignored while the label still reads "Copied!".
    pub fn copy_at(&mut self, now: Instant) -> Result<()> {
        let address = self.user_address_text().ok_or(WalletError::NotLoggedIn)?;
        if self.copy_label_at(now) == COPIED_LABEL {
            log::debug!("[Wallet] copy ignored: already copied");
            return Ok(());
        }
        if let Err(err) = self.clipboard.write_text(&address) {
            status_center::publish(&self.status, |s| {
                s.publish_error("wallet.copy", format!("Copy failed: {err}"))
            });
            return Err(err);
        }
        self.copied_at = Some(now);
        status_center::publish(&self.status, |s| {
            s.publish_success("wallet.copy", format!("Copied {}", abbreviate_address(&address)))
        });
        Ok(())
    }

    /// Log out through the provider and forget the session locally.
    pub async fn disconnect(&mut self, provider: &mut SessionProvider) -> Result<()> {
        let result = provider.logout().await;
        self.set_smart_account(None);
        self.set_session(None);
        result
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, Bytes, B256};

    use super::*;
    use crate::auth::AuthClient;
    use crate::chain::TransactionRequest;
    use crate::panels::MemoryClipboard;

    struct Signer;

    impl AuthClient for Signer {
        fn login(&self) -> Result<Address> {
            Ok(Address::repeat_byte(0x1d))
        }
        fn is_logged_in(&self) -> Result<bool> {
            Ok(true)
        }
        fn logout(&self) -> Result<()> {
            Ok(())
        }
        fn send_transaction(&self, _tx: &TransactionRequest) -> Result<B256> {
            Ok(B256::ZERO)
        }
        fn sign_message(&self, _message: &[u8]) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn panel(network: Network) -> AccountInfoPanel {
        let mut panel = AccountInfoPanel::new(
            network,
            Arc::new(MemoryClipboard::default()),
            status_center::shared(),
        );
        panel.set_session(Some(Session::new(Arc::new(Signer), Address::repeat_byte(0x1d))));
        panel
    }

    #[test]
    fn copy_is_ignored_while_label_reads_copied() {
        let mut panel = panel(Network::EthereumSepolia);
        let start = Instant::now();
        panel.copy_at(start).unwrap();
        panel.copy_at(start + Duration::from_millis(500)).unwrap();
        // The second copy did not restart the reset timer.
        assert_eq!(
            panel.copy_label_at(start + Duration::from_millis(1_100)),
            COPY_LABEL
        );
        panel.copy_at(start + Duration::from_millis(1_200)).unwrap();
        assert_eq!(
            panel.copy_label_at(start + Duration::from_millis(1_300)),
            COPIED_LABEL
        );
    }

    #[test]
    fn balances_and_faucet_carry_the_token() {
        let mut testnet = panel(Network::PolygonAmoy);
        assert_eq!(testnet.user_balance_text(), "...");
        testnet.user_balance = BalanceDisplay::Loaded(U256::ZERO);
        assert_eq!(testnet.user_balance_text(), "0 POL");
        assert_eq!(
            testnet.faucet_text().as_deref(),
            Some("Get Test POL: https://faucet.polygon.technology/")
        );
        assert!(panel(Network::Ethereum).faucet_text().is_none());
    }

    #[test]
    fn balance_texts() {
        assert_eq!(BalanceDisplay::Loading.text(), "...");
        assert_eq!(BalanceDisplay::Loaded(U256::ZERO).text(), "0");
        let wei = U256::from(1_234_567_891_000_000_000u128);
        assert_eq!(BalanceDisplay::Loaded(wei).text(), "1.23456");
    }
}
