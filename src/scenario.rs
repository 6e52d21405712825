//! The credit delegation scenario.
//!
//! Strictly sequential: fork, impersonate the holder, deploy the delegation
//! helper, approve it, deposit collateral through it, then decode the
//! deposit receipt. Any failure before decoding aborts the run; nothing is
//! retried.

use alloy::primitives::{Address, TxHash, U256};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use credit_delegation_evm::{EvmError, Wallet};

use crate::artifact::ContractArtifact;
use crate::config::ScenarioCtx;
use crate::contract::{ContractHandle, Interface};
use crate::decode::{DecodedLog, decode_all, receipt_logs};
use crate::delegation::{DelegationClient, deploy};
use crate::fork::{ForkControl, ForkError, ForkSpec};
use crate::token::TokenClient;

/// Scenario steps that can fail after the signer is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    TokenBalance,
    Deploy,
    Approve,
    Allowance,
    DepositCollateral,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TokenBalance => "token balance",
            Self::Deploy => "delegation deploy",
            Self::Approve => "approve",
            Self::Allowance => "allowance",
            Self::DepositCollateral => "depositCollateral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("fork source unavailable")]
    ForkUnavailable(#[source] ForkError),
    #[error("node rejected impersonation of {address}")]
    ImpersonationRejected {
        address: Address,
        #[source]
        source: EvmError,
    },
    #[error("{step} transaction reverted")]
    TransactionReverted {
        step: Step,
        #[source]
        source: EvmError,
    },
    #[error("{step} transaction not confirmed in time")]
    TransactionTimeout {
        step: Step,
        #[source]
        source: EvmError,
    },
    /// The node could not be reached or the wait for the receipt broke
    /// off; the transaction may or may not have executed.
    #[error("{step} transaction failed")]
    Transaction {
        step: Step,
        #[source]
        source: EvmError,
    },
    #[error("delegation deployment failed")]
    DeploymentReverted(#[source] EvmError),
    #[error("failed to read {step}")]
    Read {
        step: Step,
        #[source]
        source: EvmError,
    },
    #[error("failed to write scenario output")]
    Output(#[from] std::io::Error),
}

fn transaction_failed(step: Step) -> impl FnOnce(EvmError) -> ScenarioError {
    move |source| match source {
        EvmError::Timeout { .. } => ScenarioError::TransactionTimeout { step, source },
        source if source.is_revert() => ScenarioError::TransactionReverted { step, source },
        source => ScenarioError::Transaction { step, source },
    }
}

fn deployment_failed(source: EvmError) -> ScenarioError {
    if source.is_revert() {
        ScenarioError::DeploymentReverted(source)
    } else {
        transaction_failed(Step::Deploy)(source)
    }
}

fn read_failed(step: Step) -> impl FnOnce(EvmError) -> ScenarioError {
    move |source| ScenarioError::Read { step, source }
}

/// What a completed run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub signer: Address,
    pub token_balance: U256,
    pub delegation: Address,
    pub allowance: U256,
    pub deposit_tx: TxHash,
    pub logs: Vec<DecodedLog>,
}

pub struct Scenario<F: ForkControl> {
    fork_control: F,
    fork: ForkSpec,
    params: ScenarioCtx,
    artifact: ContractArtifact,
}

impl<F: ForkControl> Scenario<F> {
    pub fn new(
        fork_control: F,
        fork: ForkSpec,
        params: ScenarioCtx,
        artifact: ContractArtifact,
    ) -> Self {
        Self {
            fork_control,
            fork,
            params,
            artifact,
        }
    }

    /// Runs every step, printing progress to `stdout`.
    pub async fn run<W: Write>(&self, stdout: &mut W) -> Result<ScenarioReport, ScenarioError> {
        let params = &self.params;

        self.fork_control
            .reset_to_fork(&self.fork)
            .await
            .map_err(ScenarioError::ForkUnavailable)?;

        let signer = Arc::new(
            self.fork_control
                .impersonate(params.holder)
                .await
                .map_err(|source| ScenarioError::ImpersonationRejected {
                    address: params.holder,
                    source,
                })?,
        );
        info!(signer = %signer.address(), "Impersonating holder");
        writeln!(stdout, "signer: {}", signer.address())?;

        let token_handle = ContractHandle::new(params.token, Interface::erc20())
            .with_label(params.token_label.clone());
        let token = TokenClient::new(Arc::clone(&signer), token_handle.clone())
            .with_gas_price(params.gas_price);

        let token_balance = token
            .balance_of(params.holder)
            .await
            .map_err(read_failed(Step::TokenBalance))?;
        info!(%token_balance, "Holder token balance");
        writeln!(stdout, "token balance: {token_balance}")?;

        let delegation = deploy(
            &signer,
            &self.artifact,
            params.deploy_gas_limit,
            params.gas_price,
        )
        .await
        .map_err(deployment_failed)?;
        writeln!(stdout, "delegation: {}", delegation.address)?;

        token
            .approve(delegation.address, params.approval_amount)
            .await
            .map_err(transaction_failed(Step::Approve))?;

        let allowance = token
            .allowance(params.holder, delegation.address)
            .await
            .map_err(read_failed(Step::Allowance))?;
        info!(%allowance, spender = %delegation.address, "Delegation allowance");
        writeln!(stdout, "allowance: {allowance}")?;

        let receipt = DelegationClient::new(Arc::clone(&signer), delegation.clone())
            .with_gas_price(params.gas_price)
            .deposit_collateral(
                params.token,
                params.deposit_amount,
                params.use_as_collateral,
                params.deposit_gas_limit,
            )
            .await
            .map_err(transaction_failed(Step::DepositCollateral))?;
        writeln!(stdout, "depositTrans: {}", receipt.transaction_hash)?;

        let candidates = [
            delegation.clone(),
            ContractHandle::new(params.lending_pool, Interface::lending_pool()),
            token_handle,
        ];
        let logs = decode_all(receipt_logs(&receipt), &candidates);

        for log in &logs {
            writeln!(stdout, "{log}")?;
        }
        info!(
            tx_hash = %receipt.transaction_hash,
            logs = logs.len(),
            decoded = logs.iter().filter(|log| matches!(log, DecodedLog::Event(_))).count(),
            "Scenario complete"
        );

        Ok(ScenarioReport {
            signer: signer.address(),
            token_balance,
            delegation: delegation.address,
            allowance,
            deposit_tx: receipt.transaction_hash,
            logs,
        })
    }
}
