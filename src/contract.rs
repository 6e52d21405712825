//! Contract handles: an address paired with the ABI used to talk to it.

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;

use crate::bindings::{IERC20, ILendingPool};

/// A named ABI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub abi: JsonAbi,
}

impl Interface {
    pub fn new(name: impl Into<String>, abi: JsonAbi) -> Self {
        Self {
            name: name.into(),
            abi,
        }
    }

    pub fn erc20() -> Self {
        Self::new("IERC20", IERC20::abi::contract())
    }

    pub fn lending_pool() -> Self {
        Self::new("ILendingPool", ILendingPool::abi::contract())
    }
}

/// A deployed contract seen through one interface.
///
/// The same address may back several handles with different roles, e.g. a
/// token seen both as `IERC20` and as a protocol-specific reserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    pub address: Address,
    pub interface: Interface,
    /// Display name for logs emitted by `address`. Defaults to the
    /// interface name.
    pub label: String,
}

impl ContractHandle {
    pub fn new(address: Address, interface: Interface) -> Self {
        Self {
            address,
            label: interface.name.clone(),
            interface,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
