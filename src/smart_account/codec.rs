use super::*;

/// `high << 128 | low`, as used by `accountGasLimits` and `gasFees`.
pub(super) fn pack_uints_128(high: U256, low: U256) -> B256 {
    let high: u128 = high.saturating_to();
    let low: u128 = low.saturating_to();
    let packed: U256 = (U256::from(high) << 128) | U256::from(low);
    B256::from(packed.to_be_bytes())
}

fn u128_be(value: U256) -> [u8; 16] {
    let value: u128 = value.saturating_to();
    value.to_be_bytes()
}

/// `factory ++ factoryData`, empty once the account is deployed.
pub(super) fn init_code(op: &UserOperation) -> Bytes {
    match op.factory {
        Some(factory) => {
            let mut bytes = factory.as_slice().to_vec();
            if let Some(data) = &op.factory_data {
                bytes.extend_from_slice(data);
            }
            bytes.into()
        }
        None => Bytes::new(),
    }
}

/// `paymaster ++ verificationGas(16) ++ postOpGas(16) ++ paymasterData`.
pub(super) fn paymaster_and_data(op: &UserOperation) -> Bytes {
    let Some(paymaster) = op.paymaster else {
        return Bytes::new();
    };
    let mut bytes = paymaster.as_slice().to_vec();
    bytes.extend_from_slice(&u128_be(
        op.paymaster_verification_gas_limit.unwrap_or_default(),
    ));
    bytes.extend_from_slice(&u128_be(op.paymaster_post_op_gas_limit.unwrap_or_default()));
    if let Some(data) = &op.paymaster_data {
        bytes.extend_from_slice(data);
    }
    bytes.into()
}

/// On-chain layout of `op`, the form `getUserOpHash` hashes.
pub(super) fn pack_user_operation(op: &UserOperation) -> PackedUserOperation {
    PackedUserOperation {
        sender: op.sender,
        nonce: op.nonce,
        initCode: init_code(op),
        callData: op.call_data.clone(),
        accountGasLimits: pack_uints_128(op.verification_gas_limit, op.call_gas_limit),
        preVerificationGas: op.pre_verification_gas,
        gasFees: pack_uints_128(op.max_priority_fee_per_gas, op.max_fee_per_gas),
        paymasterAndData: paymaster_and_data(op),
        signature: op.signature.clone(),
    }
}
