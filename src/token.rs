//! ERC20 balance, allowance and approval through a [`Wallet`].

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::sol_types::SolCall;
use tracing::{debug, info};

use credit_delegation_evm::{EvmError, Wallet};

use crate::bindings::IERC20;
use crate::contract::ContractHandle;

/// Token operations performed by (and on behalf of) the wallet's account.
pub struct TokenClient<W: Wallet> {
    wallet: W,
    token: ContractHandle,
    gas_price: Option<u128>,
}

impl<W: Wallet> TokenClient<W> {
    pub fn new(wallet: W, token: ContractHandle) -> Self {
        Self {
            wallet,
            token,
            gas_price: None,
        }
    }

    #[must_use]
    pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256, EvmError> {
        let calldata = Bytes::from(IERC20::balanceOfCall { account: owner }.abi_encode());
        let returned = self.wallet.call(self.token.address, calldata).await?;
        let balance = IERC20::balanceOfCall::abi_decode_returns(&returned)?;

        debug!(token = %self.token.address, %owner, %balance, "Read token balance");
        Ok(balance)
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, EvmError> {
        let calldata = Bytes::from(IERC20::allowanceCall { owner, spender }.abi_encode());
        let returned = self.wallet.call(self.token.address, calldata).await?;
        let allowance = IERC20::allowanceCall::abi_decode_returns(&returned)?;

        debug!(token = %self.token.address, %owner, %spender, %allowance, "Read token allowance");
        Ok(allowance)
    }

    /// Sets the spender's allowance to exactly `amount` (ERC20 `approve`
    /// replaces, it does not add) and waits for confirmation.
    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, EvmError> {
        info!(token = %self.token.address, %spender, %amount, "Sending ERC20 approve");

        let calldata = Bytes::from(IERC20::approveCall { spender, amount }.abi_encode());
        let mut tx = TransactionRequest::default()
            .to(self.token.address)
            .input(calldata.into());
        if let Some(gas_price) = self.gas_price {
            tx = tx.gas_price(gas_price);
        }

        self.wallet.submit(tx, "ERC20 approve").await
    }
}
