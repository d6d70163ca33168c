//! ERC-4337 smart account bound to the session signer.
//!
//! Submitting a batch:
//! 1) derive the account address from the factory `getAddress(owner, 0)`
//! 2) attach `factory`/`factoryData` when the account has no code yet
//! 3) load the nonce from the EntryPoint
//! 4) encode `execute` (one call) or `executeBatch` (several)
//! 5) price gas from the bundler, sponsor through the paymaster
//! 6) compute the userOpHash on the EntryPoint
//! 7) sign it with the session wallet (EIP-191)
//! 8) send the user operation to the bundler

use std::sync::Arc;

use alloy_primitives::aliases::U192;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthClient, Session};
use crate::chain::{ChainClient, TransactionReceipt};
use crate::error::{Result, WalletError};
use crate::network::Network;

mod account;
mod codec;
mod connector;
mod relay;

pub use account::{RelayProvisioner, RelaySmartAccount};
pub use connector::{ConnectAction, SmartAccountConnector};
pub use relay::{
    relay_urls, BundlerClient, GasPriceTier, PaymasterClient, PimlicoBundler, PimlicoPaymaster,
    Sponsorship, UserOperationGasPrice,
};

/// Placeholder signature used while the paymaster estimates gas. Shaped like
/// a real ECDSA signature so account validation does not revert early.
const DUMMY_SIGNATURE: &str = "0xfffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c";

const ACCOUNT_SALT: u64 = 0;

sol! {
    struct PackedUserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes paymasterAndData;
        bytes signature;
    }

    function getAddress(address owner, uint256 salt) view returns (address);
    function createAccount(address owner, uint256 salt) returns (address);
    function getNonce(address sender, uint192 key) view returns (uint256);
    function getUserOpHash(PackedUserOperation userOp) view returns (bytes32);
    function execute(address dest, uint256 value, bytes func);
    function executeBatch(address[] dest, uint256[] value, bytes[] func);
}

/// One call inside a user operation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    /// Plain value transfer with empty calldata.
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: Bytes::new(),
        }
    }
}

/// EntryPoint v0.7 user operation in its JSON-RPC (unpacked) form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub actual_gas_cost: Option<U256>,
    pub receipt: TransactionReceipt,
}

/// Handle to a provisioned smart account. Immutable once built; a new
/// session gets a new handle.
pub trait SmartAccount: Send + Sync {
    fn address(&self) -> Address;
    fn owner(&self) -> Address;
    fn balance(&self) -> Result<U256>;
    /// Build, sponsor, sign and send `calls` as one user operation.
    /// Returns the user operation hash.
    fn submit(&self, calls: &[Call]) -> Result<B256>;
    /// `None` while the operation is still pending.
    fn user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>>;
}

/// Creates (or loads) the smart account owned by a session's signer.
pub trait AccountProvisioner: Send + Sync {
    fn provision(
        &self,
        session: &Session,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Arc<dyn SmartAccount>>;
}

/// Account calldata for a batch: `execute` for one call, `executeBatch`
/// otherwise.
pub fn encode_calls(calls: &[Call]) -> Result<Bytes> {
    match calls {
        [] => Err(WalletError::EmptyBatch),
        [call] => Ok(executeCall {
            dest: call.to,
            value: call.value,
            func: call.data.clone(),
        }
        .abi_encode()
        .into()),
        _ => Ok(executeBatchCall {
            dest: calls.iter().map(|c| c.to).collect(),
            value: calls.iter().map(|c| c.value).collect(),
            func: calls.iter().map(|c| c.data.clone()).collect(),
        }
        .abi_encode()
        .into()),
    }
}
