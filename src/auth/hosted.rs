use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, B256};
use serde_json::{json, Value};

use super::{run_auth_callback_server, AuthClient};
use crate::chain::TransactionRequest;
use crate::error::{Result, WalletError};
use crate::network::Network;
use crate::shared::rpc::RpcEndpoint;

const API_KEY_HEADER: &str = "x-magic-api-key";

/// Hosted passwordless wallet. Login goes through the browser; wallet calls
/// are JSON-RPC requests to the service's relay, authorised by the DID token
/// issued at login.
pub struct HostedAuthClient {
    api_key: String,
    network: Network,
    rpc_url: String,
    auth_page_url: String,
    relay: RpcEndpoint,
    did_token: Mutex<Option<String>>,
    user_address: Mutex<Option<Address>>,
}

impl HostedAuthClient {
    /// No network I/O happens here; the service is first contacted on login.
    pub fn new(
        api_key: impl Into<String>,
        network: Network,
        rpc_url: impl Into<String>,
        auth_page_url: impl Into<String>,
        relay_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        Self {
            relay: RpcEndpoint::new(relay_url).with_header(API_KEY_HEADER, api_key.clone()),
            api_key,
            network,
            rpc_url: rpc_url.into(),
            auth_page_url: auth_page_url.into(),
            did_token: Mutex::new(None),
            user_address: Mutex::new(None),
        }
    }

    fn token(&self) -> Result<Option<String>> {
        self.did_token
            .lock()
            .map(|t| t.clone())
            .map_err(|_| WalletError::Auth("token lock poisoned".to_string()))
    }

    fn set_credentials(&self, token: Option<String>, address: Option<Address>) {
        if let Ok(mut slot) = self.did_token.lock() {
            *slot = token;
        }
        if let Ok(mut slot) = self.user_address.lock() {
            *slot = address;
        }
    }

    fn relay_call(&self, method: &str, params: Value) -> Result<Value> {
        let token = self.token()?.ok_or(WalletError::NotLoggedIn)?;
        self.relay.call_with_headers(
            method,
            params,
            &[("authorization", format!("Bearer {token}"))],
        )
    }

    fn current_address(&self) -> Result<Address> {
        let slot = self
            .user_address
            .lock()
            .map_err(|_| WalletError::Auth("address lock poisoned".to_string()))?;
        (*slot).ok_or(WalletError::NotLoggedIn)
    }
}

impl AuthClient for HostedAuthClient {
    fn login(&self) -> Result<Address> {
        let state = format!("{:032x}", rand::random::<u128>());
        let params = [
            ("apiKey", self.api_key.clone()),
            ("network", self.network.as_str().to_string()),
            ("chainId", self.network.chain_id().to_string()),
            ("rpcUrl", self.rpc_url.clone()),
        ];
        let result =
            smol::block_on(run_auth_callback_server(&self.auth_page_url, &params, &state))?;

        let address = result
            .wallet_address
            .as_deref()
            .ok_or_else(|| WalletError::Auth("callback is missing walletAddress".to_string()))?
            .trim()
            .parse::<Address>()
            .map_err(|e| WalletError::Auth(format!("invalid walletAddress: {e}")))?;
        let token = result
            .did_token
            .ok_or_else(|| WalletError::Auth("callback is missing didToken".to_string()))?;

        self.set_credentials(Some(token), Some(address));
        log::info!("[Auth] logged in as {}", address);
        Ok(address)
    }

    fn is_logged_in(&self) -> Result<bool> {
        if self.token()?.is_none() {
            return Ok(false);
        }
        let result = self.relay_call("magic_auth_is_logged_in", json!([]))?;
        Ok(result.as_bool().unwrap_or(false))
    }

    fn logout(&self) -> Result<()> {
        let result = self.relay_call("magic_auth_logout", json!([]));
        self.set_credentials(None, None);
        result.map(|_| ())
    }

    fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256> {
        let result = self.relay_call("eth_sendTransaction", json!([tx]))?;
        serde_json::from_value(result)
            .map_err(|e| WalletError::decode(format!("eth_sendTransaction hash: {e}")))
    }

    fn did_token(&self) -> Option<String> {
        self.token().ok().flatten()
    }

    fn resume(&self, address: Address, did_token: String) {
        self.set_credentials(Some(did_token), Some(address));
        log::debug!("[Auth] resumed credentials for {}", address);
    }

    fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
        let address = self.current_address()?;
        let result = self.relay_call(
            "personal_sign",
            json!([Bytes::copy_from_slice(message), address]),
        )?;
        let raw = result
            .as_str()
            .ok_or_else(|| WalletError::decode("personal_sign returned non-string result"))?;
        normalize_signature(raw)
    }
}

/// Accept `0x`-prefixed r||s||v and force `v` into the 27/28 range that
/// on-chain `ecrecover` checks expect.
pub(crate) fn normalize_signature(raw: &str) -> Result<Bytes> {
    let hex_str = raw.trim();
    let hex_str = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);
    let mut bytes =
        hex::decode(hex_str).map_err(|e| WalletError::decode(format!("signature hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(WalletError::decode(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[64] < 27 {
        bytes[64] += 27;
    }
    Ok(Bytes::from(bytes))
}
