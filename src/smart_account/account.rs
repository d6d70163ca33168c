use super::*;
use crate::config::AppConfig;
use crate::shared::rpc::redact_url;

/// `eth_call` a view function and decode its return value.
fn call_view<C: SolCall>(chain: &dyn ChainClient, to: Address, call: C) -> Result<C::Return> {
    let out = chain.call(to, &call.abi_encode())?;
    C::abi_decode_returns(&out)
        .map_err(|e| WalletError::decode(format!("{} returned bad data: {e}", C::SIGNATURE)))
}

/// SimpleAccount (EntryPoint v0.7) owned by the session signer, with gas
/// sponsored by a paymaster and user operations sent through a bundler.
pub struct RelaySmartAccount {
    address: Address,
    owner: Address,
    signer: Arc<dyn AuthClient>,
    chain: Arc<dyn ChainClient>,
    bundler: Arc<dyn BundlerClient>,
    paymaster: Arc<dyn PaymasterClient>,
    entry_point: Address,
    factory: Address,
}

impl RelaySmartAccount {
    /// Resolve the counterfactual account address for the session owner.
    /// The account itself is deployed by its first user operation.
    pub fn new(
        session: &Session,
        chain: Arc<dyn ChainClient>,
        bundler: Arc<dyn BundlerClient>,
        paymaster: Arc<dyn PaymasterClient>,
        entry_point: Address,
        factory: Address,
    ) -> Result<Self> {
        let owner = session.user_address();
        let address = call_view(
            chain.as_ref(),
            factory,
            getAddressCall {
                owner,
                salt: U256::from(ACCOUNT_SALT),
            },
        )?;
        log::info!(
            "[SmartAccount] owner={} account={} factory={} entryPoint={}",
            owner,
            address,
            factory,
            entry_point
        );
        Ok(Self {
            address,
            owner,
            signer: Arc::clone(session.wallet()),
            chain,
            bundler,
            paymaster,
            entry_point,
            factory,
        })
    }

    fn nonce(&self) -> Result<U256> {
        call_view(
            self.chain.as_ref(),
            self.entry_point,
            getNonceCall {
                sender: self.address,
                key: U192::ZERO,
            },
        )
    }

    fn user_op_hash(&self, op: &UserOperation) -> Result<B256> {
        call_view(
            self.chain.as_ref(),
            self.entry_point,
            getUserOpHashCall {
                userOp: codec::pack_user_operation(op),
            },
        )
    }

    /// `factory`/`factoryData` while the account has no code on chain.
    fn deployment(&self) -> Result<(Option<Address>, Option<Bytes>)> {
        let code = self.chain.code(self.address)?;
        if !code.is_empty() {
            return Ok((None, None));
        }
        log::info!(
            "[SmartAccount] {} not deployed yet; attaching factory data",
            self.address
        );
        let data = createAccountCall {
            owner: self.owner,
            salt: U256::from(ACCOUNT_SALT),
        }
        .abi_encode();
        Ok((Some(self.factory), Some(data.into())))
    }
}

impl SmartAccount for RelaySmartAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn balance(&self) -> Result<U256> {
        self.chain.balance(self.address)
    }

    fn submit(&self, calls: &[Call]) -> Result<B256> {
        let call_data = encode_calls(calls)?;
        let (factory, factory_data) = self.deployment()?;
        let nonce = self.nonce()?;
        let prices = self.bundler.gas_price()?.standard;
        let dummy_signature = DUMMY_SIGNATURE
            .parse::<Bytes>()
            .map_err(|e| WalletError::decode(format!("dummy signature: {e}")))?;

        let mut op = UserOperation {
            sender: self.address,
            nonce,
            factory,
            factory_data,
            call_data,
            max_fee_per_gas: prices.max_fee_per_gas,
            max_priority_fee_per_gas: prices.max_priority_fee_per_gas,
            signature: dummy_signature,
            ..Default::default()
        };

        let sponsorship = self
            .paymaster
            .sponsor_user_operation(&op, self.entry_point)?;
        sponsorship.apply(&mut op);
        log::debug!(
            "[SmartAccount] sponsored: paymaster={} callGas={} verificationGas={}",
            sponsorship.paymaster,
            sponsorship.call_gas_limit,
            sponsorship.verification_gas_limit
        );

        let hash = self.user_op_hash(&op)?;
        op.signature = self.signer.sign_message(hash.as_slice())?;

        let sent = self.bundler.send_user_operation(&op, self.entry_point)?;
        if sent != hash {
            log::warn!(
                "[SmartAccount] bundler returned {} but local userOpHash is {}",
                sent,
                hash
            );
        }
        log::info!(
            "[SmartAccount] sent userOp: sender={} nonce={} calls={} hash={}",
            self.address,
            nonce,
            calls.len(),
            sent
        );
        Ok(sent)
    }

    fn user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>> {
        self.bundler.user_operation_receipt(hash)
    }
}

/// Provisions a [`RelaySmartAccount`] against the public relay for the
/// configured network.
#[derive(Debug, Clone)]
pub struct RelayProvisioner {
    network: Network,
    relay_api_key: Option<String>,
    entry_point: Address,
    factory: Address,
}

impl RelayProvisioner {
    pub fn new(
        network: Network,
        relay_api_key: Option<String>,
        entry_point: Address,
        factory: Address,
    ) -> Self {
        Self {
            network,
            relay_api_key,
            entry_point,
            factory,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.network,
            config.relay_api_key.clone(),
            config.entry_point,
            config.account_factory,
        )
    }
}

impl AccountProvisioner for RelayProvisioner {
    fn provision(
        &self,
        session: &Session,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Arc<dyn SmartAccount>> {
        let slug = self
            .network
            .relay_slug()
            .ok_or(WalletError::NotConfigured("account abstraction relay for this network"))?;
        let api_key = self
            .relay_api_key
            .as_deref()
            .ok_or(WalletError::NotConfigured("PIMLICO_API_KEY"))?;
        let (bundler_url, paymaster_url) = relay_urls(slug, api_key);
        log::info!(
            "[SmartAccount] provisioning on {}: bundler={} paymaster={}",
            self.network.name(),
            redact_url(&bundler_url),
            redact_url(&paymaster_url)
        );

        let account = RelaySmartAccount::new(
            session,
            chain,
            Arc::new(PimlicoBundler::new(bundler_url)),
            Arc::new(PimlicoPaymaster::new(paymaster_url)),
            self.entry_point,
            self.factory,
        )?;
        Ok(Arc::new(account))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy_sol_types::SolValue;

    use super::*;
    use crate::chain::TransactionRequest;

    const ACCOUNT: Address = Address::repeat_byte(0xac);
    const OWNER: Address = Address::repeat_byte(0x0e);
    const ENTRY_POINT: Address = Address::repeat_byte(0xe7);
    const FACTORY: Address = Address::repeat_byte(0xfa);
    const OP_HASH: B256 = B256::repeat_byte(0x44);

    #[derive(Default)]
    struct FakeChain {
        deployed: bool,
        short_returns: bool,
        hashed: Mutex<Option<PackedUserOperation>>,
    }

    impl ChainClient for FakeChain {
        fn chain_id(&self) -> Result<u64> {
            Ok(11_155_111)
        }
        fn balance(&self, _address: Address) -> Result<U256> {
            Ok(U256::from(42u64))
        }
        fn gas_price(&self) -> Result<U256> {
            Ok(U256::from(1u64))
        }
        fn code(&self, _address: Address) -> Result<Bytes> {
            Ok(if self.deployed {
                Bytes::from_static(&[0x60, 0x80])
            } else {
                Bytes::new()
            })
        }
        fn call(&self, to: Address, data: &[u8]) -> Result<Bytes> {
            let selector: [u8; 4] = data[..4].try_into().unwrap();
            if selector == getAddressCall::SELECTOR {
                assert_eq!(to, FACTORY);
                let call = getAddressCall::abi_decode(data).unwrap();
                assert_eq!(call.owner, OWNER);
                if self.short_returns {
                    return Ok(Bytes::from(vec![0u8; 31]));
                }
                return Ok(ACCOUNT.abi_encode().into());
            }
            assert_eq!(to, ENTRY_POINT);
            if selector == getNonceCall::SELECTOR {
                return Ok(U256::from(7u64).abi_encode().into());
            }
            if selector == getUserOpHashCall::SELECTOR {
                let call = getUserOpHashCall::abi_decode(data).unwrap();
                *self.hashed.lock().unwrap() = Some(call.userOp);
                return Ok(OP_HASH.abi_encode().into());
            }
            panic!("unexpected call {selector:?}");
        }
        fn transaction_receipt(&self, _hash: B256) -> Result<Option<TransactionReceipt>> {
            Ok(None)
        }
    }

    struct FakeSigner {
        signed: Mutex<Vec<Vec<u8>>>,
    }

    impl AuthClient for FakeSigner {
        fn login(&self) -> Result<Address> {
            Ok(OWNER)
        }
        fn is_logged_in(&self) -> Result<bool> {
            Ok(true)
        }
        fn logout(&self) -> Result<()> {
            Ok(())
        }
        fn send_transaction(&self, _tx: &TransactionRequest) -> Result<B256> {
            unreachable!("smart account never sends plain transactions")
        }
        fn sign_message(&self, message: &[u8]) -> Result<Bytes> {
            self.signed.lock().unwrap().push(message.to_vec());
            Ok(Bytes::from(vec![0x5a; 65]))
        }
    }

    #[derive(Default)]
    struct FakeRelay {
        sent: Mutex<Option<UserOperation>>,
        sponsored: Mutex<Option<UserOperation>>,
    }

    impl BundlerClient for FakeRelay {
        fn gas_price(&self) -> Result<UserOperationGasPrice> {
            let tier = |fee: u64| GasPriceTier {
                max_fee_per_gas: U256::from(fee),
                max_priority_fee_per_gas: U256::from(fee / 10),
            };
            Ok(UserOperationGasPrice {
                slow: tier(100),
                standard: tier(200),
                fast: tier(300),
            })
        }
        fn send_user_operation(&self, op: &UserOperation, entry_point: Address) -> Result<B256> {
            assert_eq!(entry_point, ENTRY_POINT);
            *self.sent.lock().unwrap() = Some(op.clone());
            Ok(OP_HASH)
        }
        fn user_operation_receipt(&self, _hash: B256) -> Result<Option<UserOperationReceipt>> {
            Ok(None)
        }
    }

    impl PaymasterClient for FakeRelay {
        fn sponsor_user_operation(
            &self,
            op: &UserOperation,
            _entry_point: Address,
        ) -> Result<Sponsorship> {
            *self.sponsored.lock().unwrap() = Some(op.clone());
            Ok(Sponsorship {
                call_gas_limit: U256::from(50_000u64),
                verification_gas_limit: U256::from(150_000u64),
                pre_verification_gas: U256::from(40_000u64),
                paymaster: Address::repeat_byte(0x77),
                paymaster_verification_gas_limit: U256::from(30_000u64),
                paymaster_post_op_gas_limit: U256::from(1u64),
                paymaster_data: Bytes::from_static(&[0x01]),
            })
        }
    }

    fn account(deployed: bool) -> (RelaySmartAccount, Arc<FakeChain>, Arc<FakeSigner>, Arc<FakeRelay>) {
        let chain = Arc::new(FakeChain {
            deployed,
            ..Default::default()
        });
        let signer = Arc::new(FakeSigner {
            signed: Mutex::new(Vec::new()),
        });
        let relay = Arc::new(FakeRelay::default());
        let session = Session::new(signer.clone(), OWNER);
        let account = RelaySmartAccount::new(
            &session,
            chain.clone(),
            relay.clone(),
            relay.clone(),
            ENTRY_POINT,
            FACTORY,
        )
        .unwrap();
        (account, chain, signer, relay)
    }

    #[test]
    fn address_comes_from_factory() {
        let (account, _, _, _) = account(true);
        assert_eq!(account.address(), ACCOUNT);
        assert_eq!(account.owner(), OWNER);
        assert_eq!(account.balance().unwrap(), U256::from(42u64));
    }

    #[test]
    fn first_submission_deploys_and_is_signed_over_op_hash() {
        let (account, chain, signer, relay) = account(false);
        let calls = [Call::transfer(Address::repeat_byte(0xbe), U256::from(10u64))];

        let hash = account.submit(&calls).unwrap();
        assert_eq!(hash, OP_HASH);

        let sponsored = relay.sponsored.lock().unwrap().clone().unwrap();
        assert_eq!(sponsored.factory, Some(FACTORY));
        assert_eq!(sponsored.nonce, U256::from(7u64));
        assert_eq!(sponsored.max_fee_per_gas, U256::from(200u64));
        assert_eq!(sponsored.signature.len(), 65);

        let sent = relay.sent.lock().unwrap().clone().unwrap();
        assert_eq!(sent.sender, ACCOUNT);
        assert_eq!(sent.call_gas_limit, U256::from(50_000u64));
        assert_eq!(sent.paymaster, Some(Address::repeat_byte(0x77)));
        assert_eq!(sent.signature, Bytes::from(vec![0x5a; 65]));
        assert_eq!(sent.call_data, encode_calls(&calls).unwrap());

        let signed = signer.signed.lock().unwrap().clone();
        assert_eq!(signed, vec![OP_HASH.to_vec()]);

        let packed = chain.hashed.lock().unwrap().clone().unwrap();
        assert_eq!(&packed.initCode[..20], FACTORY.as_slice());
        assert_eq!(packed.paymasterAndData.len(), 20 + 32 + 1);
    }

    #[test]
    fn truncated_factory_reply_is_a_decode_error() {
        let chain = Arc::new(FakeChain {
            short_returns: true,
            ..Default::default()
        });
        let signer = Arc::new(FakeSigner {
            signed: Mutex::new(Vec::new()),
        });
        let relay = Arc::new(FakeRelay::default());
        let session = Session::new(signer, OWNER);
        let result = RelaySmartAccount::new(
            &session,
            chain,
            relay.clone(),
            relay,
            ENTRY_POINT,
            FACTORY,
        );
        assert!(matches!(result, Err(WalletError::Decode(_))));
    }

    #[test]
    fn deployed_account_omits_factory() {
        let (account, _, _, relay) = account(true);
        account
            .submit(&[Call::transfer(Address::repeat_byte(0xbe), U256::from(1u64))])
            .unwrap();
        let sent = relay.sent.lock().unwrap().clone().unwrap();
        assert!(sent.factory.is_none());
        assert!(sent.factory_data.is_none());
    }

    #[test]
    fn empty_batch_never_reaches_the_relay() {
        let (account, _, signer, relay) = account(true);
        assert!(matches!(account.submit(&[]), Err(WalletError::EmptyBatch)));
        assert!(relay.sponsored.lock().unwrap().is_none());
        assert!(signer.signed.lock().unwrap().is_empty());
    }

    #[test]
    fn provisioner_requires_relay_support_and_key() {
        let chain: Arc<dyn ChainClient> = Arc::new(FakeChain {
            deployed: true,
            ..Default::default()
        });
        let signer = Arc::new(FakeSigner {
            signed: Mutex::new(Vec::new()),
        });
        let session = Session::new(signer, OWNER);

        let no_relay = RelayProvisioner::new(
            Network::EtherlinkTestnet,
            Some("key".to_string()),
            ENTRY_POINT,
            FACTORY,
        );
        assert!(matches!(
            no_relay.provision(&session, chain.clone()),
            Err(WalletError::NotConfigured(_))
        ));

        let no_key = RelayProvisioner::new(Network::EthereumSepolia, None, ENTRY_POINT, FACTORY);
        assert!(matches!(
            no_key.provision(&session, chain),
            Err(WalletError::NotConfigured("PIMLICO_API_KEY"))
        ));
    }
}
