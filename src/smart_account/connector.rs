use super::*;

/// What a session change asks of the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAction {
    /// A usable session appeared (or changed owner); provision an account.
    Connect,
    /// The session went away; drop the account.
    Disconnect,
    None,
}

/// Keeps the smart-account handle in step with the session: one provisioning
/// attempt per transition into a logged-in session with a chain client.
pub struct SmartAccountConnector {
    provisioner: Arc<dyn AccountProvisioner>,
    connected_owner: Option<Address>,
    account: Option<Arc<dyn SmartAccount>>,
}

impl SmartAccountConnector {
    pub fn new(provisioner: Arc<dyn AccountProvisioner>) -> Self {
        Self {
            provisioner,
            connected_owner: None,
            account: None,
        }
    }

    pub fn account(&self) -> Option<&Arc<dyn SmartAccount>> {
        self.account.as_ref()
    }

    /// Record the latest session and decide what to do. `chain_ready` is false
    /// while no chain read client exists; such a session counts as absent.
    pub fn on_session_change(
        &mut self,
        session: Option<&Session>,
        chain_ready: bool,
    ) -> ConnectAction {
        let owner = session
            .filter(|s| s.is_logged_in() && chain_ready)
            .map(Session::user_address);

        match (self.connected_owner, owner) {
            (previous, Some(owner)) if previous != Some(owner) => {
                self.connected_owner = Some(owner);
                self.account = None;
                ConnectAction::Connect
            }
            (Some(_), None) => {
                self.connected_owner = None;
                if self.account.take().is_some() {
                    log::info!("[SmartAccount] session ended; account handle dropped");
                }
                ConnectAction::Disconnect
            }
            _ => ConnectAction::None,
        }
    }

    /// Provision the account for `session`. Runs the blocking provisioner off
    /// the executor.
    pub async fn connect(
        &mut self,
        session: &Session,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Arc<dyn SmartAccount>> {
        if !session.is_logged_in() {
            return Err(WalletError::NotLoggedIn);
        }
        let provisioner = Arc::clone(&self.provisioner);
        let owned = session.clone();
        let result = smol::unblock(move || provisioner.provision(&owned, chain)).await;

        // A newer session may have replaced this one while provisioning ran.
        if self.connected_owner != Some(session.user_address()) {
            log::info!("[SmartAccount] discarding account for a stale session");
            return Err(WalletError::SmartAccountUnavailable);
        }
        match result {
            Ok(account) => {
                log::info!(
                    "[SmartAccount] connected: owner={} account={}",
                    account.owner(),
                    account.address()
                );
                self.account = Some(Arc::clone(&account));
                Ok(account)
            }
            Err(err) => {
                log::error!("[SmartAccount] failed to connect: {}", err);
                Err(err)
            }
        }
    }

    /// [`on_session_change`](Self::on_session_change) followed by
    /// [`connect`](Self::connect) when a connection is due.
    pub async fn sync(
        &mut self,
        session: Option<&Session>,
        chain: Option<Arc<dyn ChainClient>>,
    ) -> Result<Option<Arc<dyn SmartAccount>>> {
        let action = self.on_session_change(session, chain.is_some());
        match (action, session, chain) {
            (ConnectAction::Connect, Some(session), Some(chain)) => {
                self.connect(session, chain).await.map(Some)
            }
            _ => Ok(self.account.clone()),
        }
    }
}
