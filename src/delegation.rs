//! Credit delegation helper: deployment and collateral deposits.

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::sol_types::SolCall;
use tracing::info;

use credit_delegation_evm::{EvmError, Wallet};

use crate::artifact::ContractArtifact;
use crate::bindings::IMyV2CreditDelegation;
use crate::contract::ContractHandle;

/// Deploys `artifact` (no constructor arguments) from the wallet's account
/// and returns a handle bound to the new address and the artifact's ABI.
pub async fn deploy<W: Wallet>(
    wallet: &W,
    artifact: &ContractArtifact,
    gas_limit: u64,
    gas_price: Option<u128>,
) -> Result<ContractHandle, EvmError> {
    info!(contract = %artifact.name, gas_limit, "Deploying contract");

    let mut tx = TransactionRequest::default()
        .create()
        .input(artifact.bytecode.clone().into())
        .gas_limit(gas_limit);
    if let Some(gas_price) = gas_price {
        tx = tx.gas_price(gas_price);
    }

    let receipt = wallet.submit(tx, "delegation deploy").await?;
    let address = receipt
        .contract_address
        .ok_or(EvmError::MissingContractAddress {
            tx_hash: receipt.transaction_hash,
        })?;

    info!(contract = %artifact.name, %address, "Contract deployed");
    Ok(ContractHandle::new(address, artifact.interface()))
}

/// Calls into a deployed delegation helper.
pub struct DelegationClient<W: Wallet> {
    wallet: W,
    delegation: ContractHandle,
    gas_price: Option<u128>,
}

impl<W: Wallet> DelegationClient<W> {
    pub fn new(wallet: W, delegation: ContractHandle) -> Self {
        Self {
            wallet,
            delegation,
            gas_price: None,
        }
    }

    #[must_use]
    pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Deposits `amount` of `asset` into the lending pool through the helper.
    /// With `is_pull` the helper first pulls the tokens from the caller,
    /// which requires a prior approval.
    pub async fn deposit_collateral(
        &self,
        asset: Address,
        amount: U256,
        is_pull: bool,
        gas_limit: u64,
    ) -> Result<TransactionReceipt, EvmError> {
        info!(delegation = %self.delegation.address, %asset, %amount, is_pull, "Sending depositCollateral");

        let calldata = Bytes::from(
            IMyV2CreditDelegation::depositCollateralCall {
                asset,
                amount,
                isPull: is_pull,
            }
            .abi_encode(),
        );

        let mut tx = TransactionRequest::default()
            .to(self.delegation.address)
            .input(calldata.into())
            .gas_limit(gas_limit);
        if let Some(gas_price) = self.gas_price {
            tx = tx.gas_price(gas_price);
        }

        self.wallet.submit(tx, "depositCollateral").await
    }
}
