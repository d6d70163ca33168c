//! Owns the auth client, the chain read client and the current [`Session`].
//! The only component that reads or writes the persisted `"user"` and
//! `"didToken"` entries.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::auth::{AuthClient, HostedAuthClient, KvStore, Session, DID_TOKEN_KEY, USER_KEY};
use crate::chain::{ChainClient, RpcChainClient};
use crate::config::AppConfig;
use crate::error::{Result, WalletError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Initializing,
    Ready,
    /// No auth API key; the app stays logged out for its whole lifetime.
    Disabled,
}

pub struct SessionProvider {
    config: AppConfig,
    store: Arc<dyn KvStore>,
    state: ProviderState,
    auth: Option<Arc<dyn AuthClient>>,
    chain: Option<Arc<dyn ChainClient>>,
    session: Option<Session>,
}

impl SessionProvider {
    pub fn new(config: AppConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            store,
            state: ProviderState::Uninitialized,
            auth: None,
            chain: None,
            session: None,
        }
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the hosted auth client and the chain client from config.
    pub fn initialize(&mut self) {
        if self.state != ProviderState::Uninitialized {
            return;
        }
        let Some(api_key) = self.config.auth_api_key.clone() else {
            log::warn!(
                "[Session] MAGIC_API_KEY is not set; authentication is disabled"
            );
            self.state = ProviderState::Disabled;
            return;
        };
        self.state = ProviderState::Initializing;
        let rpc_url = self.config.rpc_url();
        let auth = HostedAuthClient::new(
            api_key,
            self.config.network,
            rpc_url.clone(),
            self.config.auth_page_url.clone(),
            self.config.auth_relay_url.clone(),
        );
        self.initialize_with(Arc::new(auth), Arc::new(RpcChainClient::new(rpc_url)));
    }

    /// Use the given clients instead of the configured ones.
    pub fn initialize_with(&mut self, auth: Arc<dyn AuthClient>, chain: Arc<dyn ChainClient>) {
        if matches!(self.state, ProviderState::Ready | ProviderState::Disabled) {
            return;
        }
        self.auth = Some(auth);
        self.chain = Some(chain);
        self.state = ProviderState::Ready;
        log::info!(
            "[Session] ready on {} (chain id {})",
            self.config.network.name(),
            self.config.network.chain_id()
        );
    }

    pub fn auth_client(&self) -> Option<Arc<dyn AuthClient>> {
        self.auth.clone()
    }

    pub fn chain_client(&self) -> Option<Arc<dyn ChainClient>> {
        self.chain.clone()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Ask the RPC endpoint for its chain id and compare it with the
    /// configured network. A mismatch is logged and reported as `false`.
    pub async fn check_chain(&self) -> Result<bool> {
        let chain = self
            .chain
            .clone()
            .ok_or(WalletError::NotConfigured("chain RPC client"))?;
        let reported = smol::unblock(move || chain.chain_id()).await?;
        let expected = self.config.network.chain_id();
        if reported != expected {
            log::warn!(
                "[Session] RPC endpoint reports chain id {} but {} expects {}",
                reported,
                self.config.network.name(),
                expected
            );
            return Ok(false);
        }
        Ok(true)
    }

    fn ready_auth(&self) -> Result<Arc<dyn AuthClient>> {
        self.auth
            .clone()
            .ok_or(WalletError::NotConfigured("MAGIC_API_KEY"))
    }

    fn forget_persisted(&self) -> Result<()> {
        let user = self.store.remove(USER_KEY);
        let token = self.store.remove(DID_TOKEN_KEY);
        user.and(token)
    }

    /// Rebuild the session from the persisted user if the auth service still
    /// considers it logged in.
    pub async fn restore(&mut self) -> Result<Option<Session>> {
        let Some(auth) = self.auth.clone() else {
            return Ok(None);
        };
        let Some(stored) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        let address = match stored.trim().parse::<Address>() {
            Ok(address) => address,
            Err(err) => {
                log::warn!("[Session] dropping unreadable stored user {:?}: {}", stored, err);
                self.forget_persisted()?;
                return Ok(None);
            }
        };
        if let Some(token) = self.store.get(DID_TOKEN_KEY)? {
            auth.resume(address, token);
        }

        let check = Arc::clone(&auth);
        let logged_in = smol::unblock(move || check.is_logged_in()).await?;
        if !logged_in {
            log::info!("[Session] stored user {} is no longer logged in", address);
            self.forget_persisted()?;
            self.session = None;
            return Ok(None);
        }

        log::info!("[Session] restored session for {}", address);
        let session = Session::new(auth, address);
        self.session = Some(session.clone());
        Ok(Some(session))
    }

    /// Interactive login through the hosted page.
    pub async fn login(&mut self) -> Result<Session> {
        let auth = self.ready_auth()?;
        let login = Arc::clone(&auth);
        let address = smol::unblock(move || login.login()).await?;
        self.store.set(USER_KEY, &address.to_checksum(None))?;
        match auth.did_token() {
            Some(token) => self.store.set(DID_TOKEN_KEY, &token)?,
            None => self.store.remove(DID_TOKEN_KEY)?,
        }
        let session = Session::new(auth, address);
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Local state is cleared even if the remote logout fails; that failure
    /// is still returned.
    pub async fn logout(&mut self) -> Result<()> {
        let auth = self.ready_auth()?;
        let remote = smol::unblock(move || auth.logout()).await;
        let local = self.forget_persisted();
        if let Some(mut ended) = self.session.take() {
            ended.mark_logged_out();
            log::debug!("[Session] ended {:?}", ended);
        }
        match &remote {
            Ok(()) => log::info!("[Session] logged out"),
            Err(err) => log::warn!("[Session] remote logout failed: {}", err),
        }
        remote.and(local)
    }
}
