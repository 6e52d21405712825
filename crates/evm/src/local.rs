//! Local signer implementation for test environments (anvil).
//!
//! `RawPrivateKeyWallet` wraps an alloy provider with an embedded `EthereumWallet`
//! and submits transactions directly. This is only compiled when the
//! `local-signer` feature is enabled and should only be used in tests.

use alloy::primitives::Address;
use alloy::providers::{Provider, WalletProvider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tracing::info;

use crate::error_decoding::decode_rpc_error;
use crate::{Confirmation, Evm, EvmError, Wallet, await_receipt};

/// Local wallet that signs and submits transactions directly.
///
/// Wraps a provider that includes a wallet filler (e.g., built with
/// `ProviderBuilder::new().wallet(wallet).connect_http(...)`).
///
/// The wallet address is derived from the provider's default signer, so
/// no separate address parameter is needed.
pub struct RawPrivateKeyWallet<P> {
    provider: P,
    confirmation: Confirmation,
}

impl<P> RawPrivateKeyWallet<P> {
    /// Creates a new `RawPrivateKeyWallet` with the given provider and confirmation policy.
    pub fn new(provider: P, confirmation: Confirmation) -> Self {
        Self {
            provider,
            confirmation,
        }
    }
}

#[async_trait]
impl<P> Evm for RawPrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    type Provider = P;

    fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> Wallet for RawPrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        self.provider.default_signer_address()
    }

    async fn submit(
        &self,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        info!(to = ?tx.to, note, "Submitting locally signed transaction");

        let tx = tx.from(self.address());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(decode_rpc_error)?;

        await_receipt(pending, self.confirmation, note).await
    }
}
