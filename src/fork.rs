//! Forked test network control.
//!
//! The scenario runs against a local Anvil node that is reset into a fork
//! of a live network before anything else happens. [`ForkControl`] is the
//! seam the driver talks to: it resets the node and hands out impersonated
//! signers. [`AnvilFork`] is the real implementation, either connected to
//! an already running node or owning one it spawned itself.

use alloy::node_bindings::{Anvil, AnvilInstance, NodeError};
use alloy::primitives::Address;
use alloy::providers::ext::AnvilApi as _;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::anvil::Forking;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use credit_delegation_evm::impersonated::ImpersonatedWallet;
use credit_delegation_evm::{Confirmation, EvmError, Wallet};

/// Where the local network forks from.
#[derive(Clone, PartialEq, Eq)]
pub struct ForkSpec {
    pub source_rpc_url: Url,
    /// `None` forks at the source chain's current head.
    pub block_number: Option<u64>,
}

impl std::fmt::Debug for ForkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkSpec")
            .field("source_rpc_url", &"[REDACTED]")
            .field("block_number", &self.block_number)
            .finish()
    }
}

impl ForkSpec {
    fn forking(&self) -> Forking {
        Forking {
            json_rpc_url: Some(self.source_rpc_url.to_string()),
            block_number: self.block_number,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForkError {
    #[error("fork source unavailable")]
    Unavailable(#[source] RpcError<TransportErrorKind>),
    #[error("failed to spawn local anvil node")]
    NodeSpawn(#[from] NodeError),
}

/// Control over a local development network that can fork and impersonate.
#[async_trait]
pub trait ForkControl: Send + Sync {
    type Signer: Wallet;

    /// Discards all local state and restarts the network as a fork of
    /// `spec`. The source endpoint must be reachable; there is no retry.
    async fn reset_to_fork(&self, spec: &ForkSpec) -> Result<(), ForkError>;

    /// Grants signing authority for `address` without its private key.
    /// Idempotent. Addresses with no on-chain history are accepted.
    async fn impersonate(&self, address: Address) -> Result<Self::Signer, EvmError>;
}

/// Anvil-backed fork controller.
pub struct AnvilFork {
    provider: DynProvider,
    confirmation: Confirmation,
    // Keeps a spawned node alive for as long as the controller.
    _node: Option<AnvilInstance>,
}

impl AnvilFork {
    /// Uses an Anvil node that is already running at `endpoint`.
    pub fn connect(endpoint: Url, confirmation: Confirmation) -> Self {
        Self {
            provider: ProviderBuilder::new().connect_http(endpoint).erased(),
            confirmation,
            _node: None,
        }
    }

    /// Spawns a fresh Anvil node owned by the returned controller. The node
    /// is killed when the controller is dropped.
    pub fn spawn(confirmation: Confirmation) -> Result<Self, ForkError> {
        let node = Anvil::new().try_spawn()?;
        let endpoint = node.endpoint_url();
        info!(%endpoint, "Spawned local anvil node");

        Ok(Self {
            provider: ProviderBuilder::new().connect_http(endpoint).erased(),
            confirmation,
            _node: Some(node),
        })
    }
}

#[async_trait]
impl ForkControl for AnvilFork {
    type Signer = ImpersonatedWallet<DynProvider>;

    async fn reset_to_fork(&self, spec: &ForkSpec) -> Result<(), ForkError> {
        info!(block_number = ?spec.block_number, "Resetting local node to fork");

        self.provider
            .anvil_reset(Some(spec.forking()))
            .await
            .map_err(|error| {
                warn!(%error, "Fork reset rejected");
                ForkError::Unavailable(error)
            })?;

        let head = self
            .provider
            .get_block_number()
            .await
            .map_err(ForkError::Unavailable)?;

        info!(head, "Fork ready");
        Ok(())
    }

    async fn impersonate(&self, address: Address) -> Result<Self::Signer, EvmError> {
        ImpersonatedWallet::activate(self.provider.clone(), address, self.confirmation).await
    }
}
