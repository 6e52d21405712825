//! Shared test fixtures: an in-memory chain that plays the token, the
//! lending pool and the delegation helper, with hooks to inject fork,
//! impersonation and transaction failures; and Anvil helpers that deploy
//! the assembled test contracts onto a real node.

use alloy::consensus::{Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::network::EthereumWallet;
use alloy::node_bindings::{Anvil, AnvilInstance};
use alloy::primitives::{
    Address, B256, Bloom, Bytes, LogData, TxHash, TxKind, U256, address, keccak256,
};
use alloy::providers::ext::AnvilApi as _;
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WalletProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{Log, TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolEvent, SolInterface};
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

use credit_delegation_evm::local::RawPrivateKeyWallet;
use credit_delegation_evm::{Confirmation, EvmError, Evm, Wallet};

use crate::artifact::ContractArtifact;
use crate::bindings::{
    IERC20, ILendingPool, IMyV2CreditDelegation, TestCreditDelegation, TestERC20,
    TestLendingPool,
};
use crate::fork::{ForkControl, ForkError, ForkSpec};

pub(crate) const LENDING_POOL: Address = address!("0xE0fBa4Fc209b4948668006B2bE61711b7f465bAe");
pub(crate) const A_TOKEN: Address = address!("0xa7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7a7");

/// Selector of the aToken `Mint(address,uint256,uint256)` event, which none
/// of the scenario's interfaces declare.
pub(crate) const MINT_TOPIC: B256 =
    alloy::primitives::b256!("0x4c209b5fc8ad50758f13e2e1088ba56a560dff690a1c6fef26394f4c03821c4f");

// Receipt log indices start here, as if earlier transactions shared the block.
const FIRST_LOG_INDEX: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    Revert,
    Timeout,
    Transport,
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    nonces: HashMap<Address, u64>,
    deployed: Vec<Address>,
    submitted: Vec<TransactionRequest>,
    failures: HashMap<String, Failure>,
    forks: Vec<ForkSpec>,
    impersonated: Vec<Address>,
    fork_unavailable: bool,
    reject_impersonation: bool,
}

/// In-memory chain with a single ERC20 token.
#[derive(Clone)]
pub(crate) struct MockChain {
    token: Address,
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub(crate) fn new(token: Address) -> Self {
        Self {
            token,
            state: Arc::new(Mutex::new(ChainState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn wallet(&self, address: Address) -> MockWallet {
        MockWallet {
            chain: self.clone(),
            address,
            provider: RootProvider::new(
                RpcClient::builder().http("http://127.0.0.1:1".parse().unwrap()),
            ),
        }
    }

    pub(crate) fn mint(&self, owner: Address, amount: U256) {
        *self.state().balances.entry(owner).or_default() += amount;
    }

    pub(crate) fn balance_of(&self, owner: Address) -> U256 {
        self.state().balances.get(&owner).copied().unwrap_or_default()
    }

    pub(crate) fn submitted(&self) -> Vec<TransactionRequest> {
        self.state().submitted.clone()
    }

    pub(crate) fn forks(&self) -> Vec<ForkSpec> {
        self.state().forks.clone()
    }

    pub(crate) fn impersonated(&self) -> Vec<Address> {
        self.state().impersonated.clone()
    }

    /// Makes every submission with this note fail.
    pub(crate) fn fail_submission(&self, note: &str, failure: Failure) {
        self.state().failures.insert(note.to_owned(), failure);
    }

    pub(crate) fn make_fork_unavailable(&self) {
        self.state().fork_unavailable = true;
    }

    pub(crate) fn reject_impersonation(&self) {
        self.state().reject_impersonation = true;
    }

    fn read(&self, contract: Address, calldata: &[u8]) -> Result<Bytes, EvmError> {
        if contract != self.token {
            return Err(EvmError::DecodedRevert(format!("no code at {contract}")));
        }

        let state = self.state();
        let returned = match IERC20::IERC20Calls::abi_decode(calldata)? {
            IERC20::IERC20Calls::balanceOf(call) => IERC20::balanceOfCall::abi_encode_returns(
                &state.balances.get(&call.account).copied().unwrap_or_default(),
            ),
            IERC20::IERC20Calls::allowance(call) => IERC20::allowanceCall::abi_encode_returns(
                &state
                    .allowances
                    .get(&(call.owner, call.spender))
                    .copied()
                    .unwrap_or_default(),
            ),
            other => {
                return Err(EvmError::DecodedRevert(format!(
                    "unsupported view call {other:?}"
                )));
            }
        };

        Ok(returned.into())
    }

    fn execute(
        &self,
        from: Address,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        let mut state = self.state();
        state.submitted.push(tx.clone());

        let nonce = {
            let nonce = state.nonces.entry(from).or_default();
            let current = *nonce;
            *nonce += 1;
            current
        };
        let tx_hash = keccak256([from.as_slice(), &nonce.to_be_bytes()].concat());

        match state.failures.get(note) {
            Some(Failure::Revert) => return Err(EvmError::Reverted { tx_hash }),
            Some(Failure::Timeout) => {
                return Err(EvmError::Timeout {
                    tx_hash,
                    waited: Duration::from_secs(120),
                });
            }
            Some(Failure::Transport) => {
                return Err(EvmError::Transport(TransportErrorKind::custom_str(
                    "connection refused",
                )));
            }
            None => {}
        }

        let input = tx.input.input().cloned().unwrap_or_default();
        let (to, contract_address, logs) = match tx.to {
            Some(TxKind::Create) | None => {
                let address = from.create(nonce);
                state.deployed.push(address);
                (None, Some(address), Vec::new())
            }
            Some(TxKind::Call(to)) if to == self.token => {
                let logs = token_call(&mut state, self.token, from, &input)
                    .ok_or(EvmError::Reverted { tx_hash })?;
                (Some(to), None, logs)
            }
            Some(TxKind::Call(to)) if state.deployed.contains(&to) => {
                let logs = delegation_call(&mut state, self.token, to, from, &input)
                    .ok_or(EvmError::Reverted { tx_hash })?;
                (Some(to), None, logs)
            }
            Some(TxKind::Call(_)) => return Err(EvmError::Reverted { tx_hash }),
        };

        info!(%tx_hash, note, "Transaction confirmed");
        Ok(receipt(tx_hash, from, to, contract_address, logs))
    }
}

fn token_call(
    state: &mut ChainState,
    token: Address,
    from: Address,
    input: &[u8],
) -> Option<Vec<(Address, LogData)>> {
    match IERC20::IERC20Calls::abi_decode(input).ok()? {
        IERC20::IERC20Calls::approve(call) => {
            state.allowances.insert((from, call.spender), call.amount);
            Some(vec![(
                token,
                IERC20::Approval {
                    owner: from,
                    spender: call.spender,
                    value: call.amount,
                }
                .encode_log_data(),
            )])
        }
        IERC20::IERC20Calls::transfer(call) => {
            move_tokens(state, from, call.recipient, call.amount)?;
            Some(vec![(
                token,
                IERC20::Transfer {
                    from,
                    to: call.recipient,
                    value: call.amount,
                }
                .encode_log_data(),
            )])
        }
        _ => None,
    }
}

/// Mirrors the Aave V2 deposit flow as seen from the receipt.
fn delegation_call(
    state: &mut ChainState,
    token: Address,
    delegation: Address,
    caller: Address,
    input: &[u8],
) -> Option<Vec<(Address, LogData)>> {
    let call = IMyV2CreditDelegation::depositCollateralCall::abi_decode(input).ok()?;
    if call.asset != token {
        return None;
    }
    let amount = call.amount;
    let mut logs = Vec::new();

    if call.isPull {
        let allowance = state
            .allowances
            .get(&(caller, delegation))
            .copied()
            .unwrap_or_default();
        let remaining = allowance.checked_sub(amount)?;
        move_tokens(state, caller, delegation, amount)?;
        state.allowances.insert((caller, delegation), remaining);
        logs.push((
            token,
            IERC20::Transfer {
                from: caller,
                to: delegation,
                value: amount,
            }
            .encode_log_data(),
        ));
    }

    logs.push((
        token,
        IERC20::Approval {
            owner: delegation,
            spender: LENDING_POOL,
            value: amount,
        }
        .encode_log_data(),
    ));
    logs.push((
        LENDING_POOL,
        ILendingPool::ReserveDataUpdated {
            reserve: token,
            liquidityRate: U256::from(1_000),
            stableBorrowRate: U256::from(2_000),
            variableBorrowRate: U256::from(3_000),
            liquidityIndex: U256::from(10).pow(U256::from(27)),
            variableBorrowIndex: U256::from(10).pow(U256::from(27)),
        }
        .encode_log_data(),
    ));

    move_tokens(state, delegation, A_TOKEN, amount)?;
    logs.push((
        token,
        IERC20::Transfer {
            from: delegation,
            to: A_TOKEN,
            value: amount,
        }
        .encode_log_data(),
    ));
    logs.push((
        A_TOKEN,
        IERC20::Transfer {
            from: Address::ZERO,
            to: delegation,
            value: amount,
        }
        .encode_log_data(),
    ));

    let mut mint_data = [0_u8; 64];
    mint_data[..32].copy_from_slice(&B256::from(amount).0);
    mint_data[32..].copy_from_slice(&B256::from(U256::from(10).pow(U256::from(27))).0);
    logs.push((
        A_TOKEN,
        LogData::new_unchecked(
            vec![MINT_TOPIC, delegation.into_word()],
            Bytes::copy_from_slice(&mint_data),
        ),
    ));

    logs.push((
        LENDING_POOL,
        ILendingPool::ReserveUsedAsCollateralEnabled {
            reserve: token,
            user: delegation,
        }
        .encode_log_data(),
    ));
    logs.push((
        LENDING_POOL,
        ILendingPool::Deposit {
            reserve: token,
            user: delegation,
            onBehalfOf: delegation,
            amount,
            referral: 0,
        }
        .encode_log_data(),
    ));

    Some(logs)
}

fn move_tokens(state: &mut ChainState, from: Address, to: Address, amount: U256) -> Option<()> {
    let from_balance = state.balances.entry(from).or_default();
    *from_balance = from_balance.checked_sub(amount)?;
    *state.balances.entry(to).or_default() += amount;
    Some(())
}

fn receipt(
    tx_hash: TxHash,
    from: Address,
    to: Option<Address>,
    contract_address: Option<Address>,
    logs: Vec<(Address, LogData)>,
) -> TransactionReceipt {
    let logs = logs
        .into_iter()
        .zip(FIRST_LOG_INDEX..)
        .map(|((address, data), log_index)| Log {
            inner: alloy::primitives::Log { address, data },
            block_number: Some(1),
            transaction_hash: Some(tx_hash),
            transaction_index: Some(0),
            log_index: Some(log_index),
            ..Log::default()
        })
        .collect();

    TransactionReceipt {
        inner: ReceiptEnvelope::Eip1559(ReceiptWithBloom {
            receipt: Receipt {
                status: true.into(),
                cumulative_gas_used: 0,
                logs,
            },
            logs_bloom: Bloom::ZERO,
        }),
        transaction_hash: tx_hash,
        transaction_index: Some(0),
        block_hash: Some(B256::repeat_byte(0xbb)),
        block_number: Some(1),
        gas_used: 21_000,
        effective_gas_price: 1_000_000_000,
        blob_gas_used: None,
        blob_gas_price: None,
        from,
        to,
        contract_address,
    }
}

/// Wallet acting on a [`MockChain`].
pub(crate) struct MockWallet {
    chain: MockChain,
    address: Address,
    provider: RootProvider,
}

#[async_trait]
impl Evm for MockWallet {
    type Provider = RootProvider;

    fn provider(&self) -> &RootProvider {
        &self.provider
    }

    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        self.chain.read(contract, &calldata)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn submit(
        &self,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        self.chain.execute(self.address, tx.from(self.address), note)
    }
}

#[async_trait]
impl ForkControl for MockChain {
    type Signer = MockWallet;

    async fn reset_to_fork(&self, spec: &ForkSpec) -> Result<(), ForkError> {
        let mut state = self.state();
        if state.fork_unavailable {
            return Err(ForkError::Unavailable(TransportErrorKind::custom_str(
                "connection refused",
            )));
        }

        state.forks.push(spec.clone());
        info!("Fork ready");
        Ok(())
    }

    async fn impersonate(&self, address: Address) -> Result<MockWallet, EvmError> {
        let mut state = self.state();
        if state.reject_impersonation {
            return Err(EvmError::ImpersonationRejected {
                address,
                source: TransportErrorKind::custom_str("method not found"),
            });
        }

        if !state.impersonated.contains(&address) {
            state.impersonated.push(address);
        }
        drop(state);

        Ok(self.wallet(address))
    }
}

/// Spawns an Anvil node that lives until the test process exits.
pub(crate) fn spawn_anvil() -> &'static AnvilInstance {
    Box::leak(Box::new(Anvil::new().spawn()))
}

/// Wallet for the node's first dev account, plus a provider signing as it.
pub(crate) fn anvil_wallet(
    anvil: &'static AnvilInstance,
) -> (
    RawPrivateKeyWallet<impl Provider + WalletProvider + Clone>,
    impl Provider + Clone,
) {
    let key = B256::from_slice(&anvil.keys()[0].to_bytes());
    let signer = PrivateKeySigner::from_bytes(&key).unwrap();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(anvil.endpoint_url());

    (
        RawPrivateKeyWallet::new(provider.clone(), Confirmation::default()),
        provider,
    )
}

/// Deploys the test ERC20 and mints `amount` to `holder`.
pub(crate) async fn deploy_test_token<P: Provider + Clone>(
    provider: P,
    holder: Address,
    amount: U256,
) -> Address {
    let token = TestERC20::deploy(provider).await.unwrap();
    token
        .mint(holder, amount)
        .send()
        .await
        .unwrap()
        .get_receipt()
        .await
        .unwrap();

    *token.address()
}

/// Puts the test lending pool's runtime code at the Aave V2 pool address.
pub(crate) async fn install_lending_pool<P: Provider>(provider: &P) {
    provider
        .anvil_set_code(LENDING_POOL, TestLendingPool::DEPLOYED_BYTECODE.clone())
        .await
        .unwrap();
}

/// Artifact for the assembled delegation helper, as if read from disk.
pub(crate) fn test_delegation_artifact() -> ContractArtifact {
    ContractArtifact {
        name: "TestCreditDelegation".to_owned(),
        abi: TestCreditDelegation::abi::contract(),
        bytecode: TestCreditDelegation::BYTECODE.clone(),
    }
}
