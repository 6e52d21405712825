//! EVM chain interaction abstraction.
//!
//! This crate provides two traits for interacting with EVM chains:
//!
//! - [`Evm`]: read-only chain access with error-decoded view calls.
//!   Provides the underlying provider and a `call` method that
//!   automatically decodes Solidity revert data (`Error(string)` and
//!   `Panic(uint256)`).
//!
//! - [`Wallet`]: extends `Evm` with a signing identity and
//!   transaction submission. Implementations decide where authority
//!   to sign comes from: a raw private key
//!   ([`RawPrivateKeyWallet`](local::RawPrivateKeyWallet), feature
//!   `local-signer`) or a development node's account impersonation
//!   ([`ImpersonatedWallet`](impersonated::ImpersonatedWallet), feature
//!   `impersonation`).
//!
//! Error decoding is built into both `Evm::call` (view calls) and
//! `Wallet::submit` (write transactions), so consumers get
//! human-readable revert reasons without manual wiring.

use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{PendingTransactionBuilder, PendingTransactionError, Provider, WatchTxError};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{info, warn};

pub mod error_decoding;

#[cfg(feature = "impersonation")]
pub mod impersonated;

#[cfg(feature = "local-signer")]
pub mod local;

/// Errors that can occur during EVM operations.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    #[error("transaction error: {0}")]
    Transaction(#[from] PendingTransactionError),
    #[error("transport error: {0}")]
    Transport(#[from] RpcError<TransportErrorKind>),
    #[error("contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("failed to decode call result: {0}")]
    AbiDecode(#[from] alloy::sol_types::Error),
    #[error("decoded contract error: {0}")]
    DecodedRevert(String),
    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: TxHash },
    #[error("transaction {tx_hash} not confirmed within {waited:?}")]
    Timeout { tx_hash: TxHash, waited: Duration },
    #[error("contract creation {tx_hash} produced no contract address")]
    MissingContractAddress { tx_hash: TxHash },
    #[error("node rejected impersonation of {address}: {source}")]
    ImpersonationRejected {
        address: Address,
        #[source]
        source: RpcError<TransportErrorKind>,
    },
}

impl EvmError {
    /// True when the chain (or the node simulating it) rejected the
    /// transaction's execution, as opposed to a transport or wait failure.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. } | Self::DecodedRevert(_))
    }
}

/// How long and how deep to wait for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub required_confirmations: u64,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Confirmation {
    pub const fn new(required_confirmations: u64, timeout: Option<Duration>) -> Self {
        Self {
            required_confirmations,
            timeout,
        }
    }
}

impl Default for Confirmation {
    fn default() -> Self {
        Self::new(1, Some(Duration::from_secs(120)))
    }
}

/// Read-only EVM chain access with error-decoded view calls.
///
/// Provides the underlying provider for direct chain queries (balance
/// checks, block numbers, etc.) and a [`call`](Evm::call) method
/// that executes `eth_call` with automatic Solidity revert decoding.
///
/// Implementations only need to supply the provider; `call` has a
/// default implementation that handles error decoding.
#[async_trait]
pub trait Evm: Send + Sync + 'static {
    /// The provider type used for chain access.
    type Provider: Provider + Clone + Send + Sync;

    /// Returns the underlying provider for direct chain queries.
    fn provider(&self) -> &Self::Provider;

    /// Execute a view call with automatic revert decoding.
    ///
    /// Runs `eth_call` against the given contract and calldata. On
    /// revert, attempts to decode the Solidity error before returning.
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        let tx = TransactionRequest::default()
            .to(contract)
            .input(calldata.into());

        self.provider()
            .call(tx)
            .await
            .map_err(error_decoding::decode_rpc_error)
    }
}

/// Signing wallet on an EVM chain.
///
/// Extends [`Evm`] with a wallet identity (address) and transaction
/// submission. [`submit`](Wallet::submit) sends a fully-specified
/// request (call or contract creation) from [`address`](Wallet::address)
/// and waits for a successful receipt; [`send`](Wallet::send) is the
/// contract-call shorthand.
#[async_trait]
pub trait Wallet: Evm {
    /// Returns the address this wallet signs transactions from.
    fn address(&self) -> Address;

    /// Submit a transaction and wait for its confirmation.
    ///
    /// - `tx`: request with at least `to`/`input` (or a create kind);
    ///   `from` is overwritten with the wallet address
    /// - `note`: human-readable operation description used for logging
    ///
    /// Fails with [`EvmError::Reverted`] when the mined receipt reports
    /// failure and with [`EvmError::Timeout`] when the confirmation does
    /// not arrive in time.
    async fn submit(
        &self,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError>;

    /// Submit a contract call transaction.
    async fn send(
        &self,
        contract: Address,
        calldata: Bytes,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        let tx = TransactionRequest::default()
            .to(contract)
            .input(calldata.into());

        self.submit(tx, note).await
    }
}

#[async_trait]
impl<T: Evm> Evm for Arc<T> {
    type Provider = T::Provider;

    fn provider(&self) -> &Self::Provider {
        (**self).provider()
    }

    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        (**self).call(contract, calldata).await
    }
}

#[async_trait]
impl<T: Wallet> Wallet for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn submit(
        &self,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        (**self).submit(tx, note).await
    }
}

/// Waits for a submitted transaction per `confirmation` and checks its
/// status. Shared by the wallet implementations.
pub async fn await_receipt(
    pending: PendingTransactionBuilder<Ethereum>,
    confirmation: Confirmation,
    note: &str,
) -> Result<TransactionReceipt, EvmError> {
    let tx_hash = *pending.tx_hash();
    info!(%tx_hash, note, "Transaction submitted");

    let receipt = pending
        .with_required_confirmations(confirmation.required_confirmations)
        .with_timeout(confirmation.timeout)
        .get_receipt()
        .await
        .map_err(|error| match error {
            PendingTransactionError::TxWatcher(WatchTxError::Timeout) => EvmError::Timeout {
                tx_hash,
                waited: confirmation.timeout.unwrap_or_default(),
            },
            other => EvmError::Transaction(other),
        })?;

    if !receipt.status() {
        warn!(tx_hash = %receipt.transaction_hash, note, "Transaction reverted on-chain");
        return Err(EvmError::Reverted {
            tx_hash: receipt.transaction_hash,
        });
    }

    info!(tx_hash = %receipt.transaction_hash, note, "Transaction confirmed");

    Ok(receipt)
}
