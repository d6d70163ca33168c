//! Terminal front-end: wires the session provider, the smart-account
//! connector and the panels to a line-based command loop.

use std::io;
use std::sync::Arc;

use futures_lite::io::BufReader;
use futures_lite::{future, AsyncBufReadExt, Stream, StreamExt};
use smol::Unblock;

use crate::auth::{FileKvStore, KvStore};
use crate::config::AppConfig;
use crate::panels::{
    field_error, AccountInfoPanel, SendAaTransactionPanel, SendTransactionPanel,
    TerminalClipboard, TransactionDraft,
};
use crate::polling::CancelToken;
use crate::session::{ProviderState, SessionProvider};
use crate::shared::address::abbreviate_address;
use crate::smart_account::{RelayProvisioner, SmartAccountConnector};
use crate::status_center::{self, SharedStatus, StatusKind};

const HELP: &str = "commands: login | refresh | copy | send <to> <amount> | send-aa <to> <amount> | cancel | logout | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Refresh,
    Copy,
    Send { to: String, amount: String },
    SendAa { to: String, amount: String },
    Cancel,
    Logout,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = parts.collect();
        let transfer = |args: &[&str]| match args {
            [to, amount] => Ok((to.to_string(), amount.to_string())),
            _ => Err(format!("usage: {name} <to> <amount>")),
        };
        match name.to_ascii_lowercase().as_str() {
            "login" => Ok(Self::Login),
            "refresh" => Ok(Self::Refresh),
            "copy" => Ok(Self::Copy),
            "send" => transfer(&args).map(|(to, amount)| Self::Send { to, amount }),
            "send-aa" => transfer(&args).map(|(to, amount)| Self::SendAa { to, amount }),
            "cancel" => Ok(Self::Cancel),
            "logout" | "disconnect" => Ok(Self::Logout),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command {other:?}")),
        }
    }
}

pub struct WalletApp {
    provider: SessionProvider,
    connector: SmartAccountConnector,
    info: AccountInfoPanel,
    send: SendTransactionPanel,
    send_aa: SendAaTransactionPanel,
    status: SharedStatus,
}

impl WalletApp {
    pub fn new(config: AppConfig, store: Arc<dyn KvStore>) -> Self {
        let status = status_center::shared();
        let network = config.network;
        let poll = config.receipt_poll;
        let connector = SmartAccountConnector::new(Arc::new(RelayProvisioner::from_config(&config)));
        Self {
            provider: SessionProvider::new(config, store),
            connector,
            info: AccountInfoPanel::new(network, Arc::new(TerminalClipboard), status.clone()),
            send: SendTransactionPanel::new(network, poll, status.clone()),
            send_aa: SendAaTransactionPanel::new(network, poll, status.clone()),
            status,
        }
    }

    /// Initialize the provider and restore a persisted session.
    pub async fn start(&mut self) {
        self.provider.initialize();
        if self.provider.state() == ProviderState::Ready {
            if let Err(err) = self.provider.check_chain().await {
                log::warn!("[Wallet] could not read chain id: {}", err);
            }
        }
        if let Err(err) = self.provider.restore().await {
            log::warn!("[Wallet] could not restore session: {}", err);
        }
        self.sync_session().await;
    }

    /// Push the provider's session into the connector and panels.
    async fn sync_session(&mut self) {
        let session = self.provider.session().cloned();
        let chain = self.provider.chain_client();
        self.info.set_session(session.clone());
        self.info.set_chain_client(chain.clone());

        match self.connector.sync(session.as_ref(), chain).await {
            Ok(account) => self.info.set_smart_account(account),
            Err(err) => {
                self.info.set_smart_account(None);
                status_center::publish(&self.status, |s| {
                    s.publish_error("wallet.account", format!("Smart account unavailable: {err}"))
                });
            }
        }
        if let Err(err) = self.info.refresh_once().await {
            log::warn!("[Wallet] initial balance refresh failed: {}", err);
        }
    }

    pub async fn run<S>(&mut self, lines: &mut S) -> io::Result<()>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        println!("{HELP}");
        self.render();
        while let Some(line) = lines.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(msg) => {
                    println!("{msg}");
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command, lines).await;
            self.render();
        }
        Ok(())
    }

    async fn execute<S>(&mut self, command: Command, lines: &mut S)
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        match command {
            Command::Login => {
                if self.provider.state() == ProviderState::Disabled {
                    println!("authentication is disabled: set MAGIC_API_KEY");
                    return;
                }
                match self.provider.login().await {
                    Ok(session) => log::info!("[Wallet] logged in as {}", session.user_address()),
                    Err(err) => status_center::publish(&self.status, |s| {
                        s.publish_error("wallet.login", format!("Login failed: {err}"))
                    }),
                }
                self.sync_session().await;
            }
            Command::Refresh => {
                if let Err(err) = self.info.refresh().await {
                    println!("balance refresh incomplete: {err}");
                }
            }
            Command::Copy => {
                if let Err(err) = self.info.copy() {
                    println!("copy failed: {err}");
                }
            }
            Command::Send { to, amount } => {
                self.send.draft = TransactionDraft::new(to, amount);
                let session = self.provider.session().cloned();
                let chain = self.provider.chain_client();
                let token = self.send.cancel_token();
                let result = future::or(
                    self.send.send(session.as_ref(), chain),
                    watch_for_cancel(lines, token),
                )
                .await;
                if result.is_ok() {
                    let _ = self.info.refresh().await;
                }
            }
            Command::SendAa { to, amount } => {
                self.send_aa.draft = TransactionDraft::new(to, amount);
                let account = self.connector.account().cloned();
                let token = self.send_aa.cancel_token();
                let result = future::or(
                    self.send_aa.send(account.as_ref()),
                    watch_for_cancel(lines, token),
                )
                .await;
                if result.is_ok() {
                    let _ = self.info.refresh().await;
                }
            }
            Command::Cancel => println!("nothing to cancel"),
            Command::Logout => {
                if let Err(err) = self.info.disconnect(&mut self.provider).await {
                    log::warn!("[Wallet] logout: {}", err);
                }
                self.sync_session().await;
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }

    fn render(&mut self) {
        println!();
        println!("{}", self.info.network_status());
        match self.info.user_address_text() {
            Some(address) => {
                println!("  wallet        {address} [{}]", self.info.copy_label());
                println!("  balance       {}", self.info.user_balance_text());
                println!("  smart account {}", self.info.smart_account_text());
                println!("  balance       {}", self.info.account_balance_text());
            }
            None => println!("  not logged in (type 'login')"),
        }
        if let Some(faucet) = self.info.faucet_text() {
            println!("  {faucet}");
        }
        let token = self.provider.config().network.token();
        render_send("send   ", token, &self.send.draft, self.send.last_error());
        render_send("send-aa", token, &self.send_aa.draft, self.send_aa.last_error());

        status_center::publish(&self.status, |s| {
            s.sweep_expired();
            if let Some(entry) = s.entries().last() {
                let marker = match entry.kind {
                    StatusKind::Progress => "…",
                    StatusKind::Info => "i",
                    StatusKind::Success => "✓",
                    StatusKind::Error => "!",
                };
                println!("[{marker}] {}", entry.message);
            }
        });
    }
}

fn render_send(label: &str, token: &str, draft: &TransactionDraft, last_error: Option<&str>) {
    if let Some(err) = field_error(draft) {
        println!("  {label} {err}");
    } else if let Some(err) = last_error {
        println!("  {label} error: {err}");
    } else if draft.to_address.is_empty() {
        println!("  {label} <to> <Amount ({token})>");
    } else {
        println!(
            "  {label} {} {token} -> {}",
            draft.amount,
            abbreviate_address(&draft.to_address)
        );
    }
}

/// Read lines while a send is waiting; only a `cancel` line stops its
/// receipt poll. Never completes, so the send always finishes first.
async fn watch_for_cancel<T, S>(lines: &mut S, token: CancelToken) -> T
where
    S: Stream<Item = io::Result<String>> + Unpin,
{
    while let Some(line) = lines.next().await {
        match line.map(|l| l.trim().to_ascii_lowercase()) {
            Ok(cmd) if cmd == "cancel" => {
                token.cancel();
                break;
            }
            Ok(cmd) if cmd.is_empty() => {}
            Ok(_) => println!("a submission is in flight; type 'cancel' to stop waiting"),
            Err(err) => {
                log::warn!("[Wallet] stdin error: {}", err);
                break;
            }
        }
    }
    future::pending().await
}

/// Load `.env`, set up logging and run the wallet until `quit` or EOF.
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let store = FileKvStore::in_app_data_dir();
    log::info!(
        "[Config] network={} rpc={} store={:?}",
        config.network.as_str(),
        config.rpc_url(),
        store.path()
    );

    smol::block_on(async move {
        let mut app = WalletApp::new(config, Arc::new(store));
        app.start().await;
        let mut lines = BufReader::new(Unblock::new(io::stdin())).lines();
        app.run(&mut lines).await
    })?;
    Ok(())
}
