use serde_json::json;

use super::*;
use crate::shared::rpc::RpcEndpoint;

/// Bundler and paymaster endpoints for a relay network slug.
pub fn relay_urls(slug: &str, api_key: &str) -> (String, String) {
    let key = urlencoding::encode(api_key);
    (
        format!("https://api.pimlico.io/v1/{slug}/rpc?apikey={key}"),
        format!("https://api.pimlico.io/v2/{slug}/rpc?apikey={key}"),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceTier {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UserOperationGasPrice {
    pub slow: GasPriceTier,
    pub standard: GasPriceTier,
    pub fast: GasPriceTier,
}

/// Gas limits and paymaster fields returned by a sponsorship request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsorship {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub paymaster: Address,
    pub paymaster_verification_gas_limit: U256,
    pub paymaster_post_op_gas_limit: U256,
    pub paymaster_data: Bytes,
}

impl Sponsorship {
    pub fn apply(&self, op: &mut UserOperation) {
        op.call_gas_limit = self.call_gas_limit;
        op.verification_gas_limit = self.verification_gas_limit;
        op.pre_verification_gas = self.pre_verification_gas;
        op.paymaster = Some(self.paymaster);
        op.paymaster_verification_gas_limit = Some(self.paymaster_verification_gas_limit);
        op.paymaster_post_op_gas_limit = Some(self.paymaster_post_op_gas_limit);
        op.paymaster_data = Some(self.paymaster_data.clone());
    }
}

pub trait BundlerClient: Send + Sync {
    fn gas_price(&self) -> Result<UserOperationGasPrice>;
    fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256>;
    fn user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>>;
}

pub trait PaymasterClient: Send + Sync {
    fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<Sponsorship>;
}

pub struct PimlicoBundler {
    endpoint: RpcEndpoint,
}

impl PimlicoBundler {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            endpoint: RpcEndpoint::new(url),
        }
    }
}

impl BundlerClient for PimlicoBundler {
    fn gas_price(&self) -> Result<UserOperationGasPrice> {
        self.endpoint
            .call_as("pimlico_getUserOperationGasPrice", json!([]))
    }

    fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256> {
        self.endpoint
            .call_as("eth_sendUserOperation", json!([op, entry_point]))
    }

    fn user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>> {
        self.endpoint
            .call_as("eth_getUserOperationReceipt", json!([hash]))
    }
}

pub struct PimlicoPaymaster {
    endpoint: RpcEndpoint,
}

impl PimlicoPaymaster {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            endpoint: RpcEndpoint::new(url),
        }
    }
}

impl PaymasterClient for PimlicoPaymaster {
    fn sponsor_user_operation(
        &self,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<Sponsorship> {
        self.endpoint
            .call_as("pm_sponsorUserOperation", json!([op, entry_point]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_use_v1_bundler_and_v2_paymaster() {
        let (bundler, paymaster) = relay_urls("sepolia", "pim_key");
        assert_eq!(
            bundler,
            "https://api.pimlico.io/v1/sepolia/rpc?apikey=pim_key"
        );
        assert_eq!(
            paymaster,
            "https://api.pimlico.io/v2/sepolia/rpc?apikey=pim_key"
        );
    }

    #[test]
    fn gas_price_tiers_decode() {
        let tier = json!({"maxFeePerGas": "0x10", "maxPriorityFeePerGas": "0x2"});
        let prices: UserOperationGasPrice = serde_json::from_value(json!({
            "slow": tier, "standard": tier, "fast": tier
        }))
        .unwrap();
        assert_eq!(prices.standard.max_fee_per_gas, U256::from(16u64));
        assert_eq!(prices.standard.max_priority_fee_per_gas, U256::from(2u64));
    }

    #[test]
    fn sponsorship_fills_gas_and_paymaster_fields() {
        let sponsorship: Sponsorship = serde_json::from_value(json!({
            "callGasLimit": "0x100",
            "verificationGasLimit": "0x200",
            "preVerificationGas": "0x300",
            "paymaster": "0x7777777777777777777777777777777777777777",
            "paymasterVerificationGasLimit": "0x40",
            "paymasterPostOpGasLimit": "0x1",
            "paymasterData": "0xbeef"
        }))
        .unwrap();
        let mut op = UserOperation::default();
        sponsorship.apply(&mut op);
        assert_eq!(op.call_gas_limit, U256::from(0x100u64));
        assert_eq!(op.paymaster, Some(Address::repeat_byte(0x77)));
        assert_eq!(op.paymaster_data, Some(Bytes::from_static(&[0xbe, 0xef])));
    }
}
