//! Read access to the configured chain over JSON-RPC.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::shared::rpc::RpcEndpoint;

/// Native transfer as handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub status: Option<U256>,
    #[serde(default)]
    pub gas_used: Option<U256>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts have no status; treat them as successful.
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| !s.is_zero()).unwrap_or(true)
    }
}

pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> Result<u64>;
    fn balance(&self, address: Address) -> Result<U256>;
    fn gas_price(&self) -> Result<U256>;
    fn code(&self, address: Address) -> Result<Bytes>;
    fn call(&self, to: Address, data: &[u8]) -> Result<Bytes>;
    fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>>;
}

pub struct RpcChainClient {
    endpoint: RpcEndpoint,
}

impl RpcChainClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            endpoint: RpcEndpoint::new(rpc_url),
        }
    }

    pub fn rpc_url(&self) -> &str {
        self.endpoint.url()
    }
}

impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> Result<u64> {
        let id: U256 = self.endpoint.call_as("eth_chainId", json!([]))?;
        Ok(id.saturating_to())
    }

    fn balance(&self, address: Address) -> Result<U256> {
        self.endpoint
            .call_as("eth_getBalance", json!([address, "latest"]))
    }

    fn gas_price(&self) -> Result<U256> {
        self.endpoint.call_as("eth_gasPrice", json!([]))
    }

    fn code(&self, address: Address) -> Result<Bytes> {
        self.endpoint
            .call_as("eth_getCode", json!([address, "latest"]))
    }

    fn call(&self, to: Address, data: &[u8]) -> Result<Bytes> {
        self.endpoint.call_as(
            "eth_call",
            json!([
                {
                    "to": to,
                    "data": Bytes::copy_from_slice(data),
                },
                "latest"
            ]),
        )
    }

    fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        self.endpoint
            .call_as("eth_getTransactionReceipt", json!([hash]))
    }
}
