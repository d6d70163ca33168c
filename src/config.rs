use std::env;
use std::time::Duration;

use alloy_primitives::Address;

use crate::error::{Result, WalletError};
use crate::network::Network;
use crate::polling::{PollConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_SECS};

/// EntryPoint v0.7, same address on every supported chain.
pub const DEFAULT_ENTRYPOINT: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";
/// SimpleAccountFactory for EntryPoint v0.7.
pub const DEFAULT_ACCOUNT_FACTORY: &str = "0x91E60e0613810449d098b0b5Ec8b51A0FE8c8985";

const DEFAULT_AUTH_PAGE_URL: &str = "http://localhost:3000/login";
const DEFAULT_AUTH_RELAY_URL: &str = "http://localhost:3000/api/wallet-rpc";

pub fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_or(primary: &str, fallback: &str) -> Option<String> {
    non_empty_env(primary).or_else(|| non_empty_env(fallback))
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    match non_empty_env(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            log::warn!("[Config] {key}={raw:?} is not a number, using {default}");
            default
        }),
        None => default,
    }
}

/// Everything the wallet needs from the environment, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Publishable key of the passwordless auth service. `None` disables auth.
    pub auth_api_key: Option<String>,
    /// Key for the bundler/paymaster relay. `None` disables the smart account.
    pub relay_api_key: Option<String>,
    pub network: Network,
    pub rpc_url_override: Option<String>,
    pub auth_page_url: String,
    pub auth_relay_url: String,
    pub entry_point: Address,
    pub account_factory: Address,
    pub receipt_poll: PollConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let network_name = env_or("BLOCKCHAIN_NETWORK", "NEXT_PUBLIC_BLOCKCHAIN_NETWORK");
        let entry_point = non_empty_env("AA_ENTRYPOINT")
            .unwrap_or_else(|| DEFAULT_ENTRYPOINT.to_string())
            .trim()
            .parse::<Address>()
            .map_err(|e| WalletError::decode(format!("invalid AA_ENTRYPOINT: {e}")))?;
        let account_factory = non_empty_env("AA_FACTORY")
            .unwrap_or_else(|| DEFAULT_ACCOUNT_FACTORY.to_string())
            .trim()
            .parse::<Address>()
            .map_err(|e| WalletError::decode(format!("invalid AA_FACTORY: {e}")))?;

        Ok(Self {
            auth_api_key: env_or("MAGIC_API_KEY", "NEXT_PUBLIC_MAGIC_API_KEY"),
            relay_api_key: env_or("PIMLICO_API_KEY", "NEXT_PUBLIC_PIMLICO_API_KEY"),
            network: Network::resolve(network_name.as_deref()),
            rpc_url_override: non_empty_env("RPC_URL"),
            auth_page_url: non_empty_env("AUTH_PAGE_URL")
                .unwrap_or_else(|| DEFAULT_AUTH_PAGE_URL.to_string()),
            auth_relay_url: non_empty_env("AUTH_RELAY_URL")
                .unwrap_or_else(|| DEFAULT_AUTH_RELAY_URL.to_string()),
            entry_point,
            account_factory,
            receipt_poll: PollConfig {
                interval: Duration::from_millis(parse_env_u64(
                    "RECEIPT_POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )),
                timeout: Duration::from_secs(parse_env_u64(
                    "RECEIPT_POLL_TIMEOUT_SECS",
                    DEFAULT_POLL_TIMEOUT_SECS,
                )),
            },
        })
    }

    /// Config with no keys and default addresses; handy as a base in tests.
    pub fn unconfigured(network: Network) -> Self {
        Self {
            auth_api_key: None,
            relay_api_key: None,
            network,
            rpc_url_override: None,
            auth_page_url: DEFAULT_AUTH_PAGE_URL.to_string(),
            auth_relay_url: DEFAULT_AUTH_RELAY_URL.to_string(),
            entry_point: DEFAULT_ENTRYPOINT.parse().unwrap_or_default(),
            account_factory: DEFAULT_ACCOUNT_FACTORY.parse().unwrap_or_default(),
            receipt_poll: PollConfig::default(),
        }
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url_override
            .clone()
            .unwrap_or_else(|| self.network.rpc_url().to_string())
    }
}
