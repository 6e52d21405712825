//! Account impersonation on development nodes (anvil, hardhat).
//!
//! `ImpersonatedWallet` signs as an arbitrary existing address without
//! holding its private key: the node is asked to accept unsigned
//! transactions from that address (`anvil_impersonateAccount`) and every
//! submission goes through `eth_sendTransaction` with `from` set. Only
//! development nodes expose this capability, which is why the type is
//! gated behind the `impersonation` feature and can only be obtained
//! through [`ImpersonatedWallet::activate`].

use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::providers::ext::AnvilApi as _;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error_decoding::decode_rpc_error;
use crate::{Confirmation, Evm, EvmError, Wallet, await_receipt};

/// Wallet acting as `address` on a node that accepted impersonation.
#[derive(Debug, Clone)]
pub struct ImpersonatedWallet<P> {
    provider: P,
    address: Address,
    confirmation: Confirmation,
}

impl<P> ImpersonatedWallet<P>
where
    P: Provider + Clone,
{
    /// Requests impersonation of `address` and returns a wallet for it.
    ///
    /// The address does not need to exist on chain. Repeating the request
    /// for an already impersonated address is a no-op on the node.
    pub async fn activate(
        provider: P,
        address: Address,
        confirmation: Confirmation,
    ) -> Result<Self, EvmError> {
        provider
            .anvil_impersonate_account(address)
            .await
            .map_err(|source| EvmError::ImpersonationRejected { address, source })?;

        info!(%address, "Impersonation active");

        Ok(Self {
            provider,
            address,
            confirmation,
        })
    }
}

#[async_trait]
impl<P> Evm for ImpersonatedWallet<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    type Provider = P;

    fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> Wallet for ImpersonatedWallet<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        self.address
    }

    async fn submit(
        &self,
        tx: TransactionRequest,
        note: &str,
    ) -> Result<TransactionReceipt, EvmError> {
        info!(from = %self.address, to = ?tx.to, note, "Submitting impersonated transaction");

        let tx = tx.from(self.address);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(decode_rpc_error)?;

        let inclusion = Confirmation {
            required_confirmations: 1,
            ..self.confirmation
        };
        let receipt = await_receipt(pending, inclusion, note).await?;

        // Development nodes mine one block per transaction and nothing
        // after it, so the remaining confirmations are mined here.
        let remaining = self.confirmation.required_confirmations.saturating_sub(1);
        if remaining > 0 {
            self.provider.anvil_mine(Some(remaining), None).await?;
            debug!(
                tx_hash = %receipt.transaction_hash,
                blocks = remaining,
                "Mined confirmation blocks"
            );
        }

        Ok(receipt)
    }
}
