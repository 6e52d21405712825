//! Contract error decoding utilities.
//!
//! Turns Solidity revert data carried by JSON-RPC error responses into
//! human-readable reasons (`Error(string)`, `Panic(uint256)`, or the
//! raw selector when neither matches).

use alloy::hex;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportErrorKind};
use tracing::debug;

use crate::EvmError;

/// Renders revert data as a reason string.
///
/// Unrecognized payloads are rendered as `unknown error 0x<data>` so the
/// raw bytes remain available for diagnosis.
pub fn describe_revert(revert_data: &[u8]) -> String {
    decode_revert_reason(revert_data)
        .filter(|reason| !reason.chars().any(char::is_control))
        .unwrap_or_else(|| format!("unknown error {}", hex::encode_prefixed(revert_data)))
}

/// Handles a contract error by attempting to decode revert data.
///
/// If the error contains revert data it becomes [`EvmError::DecodedRevert`],
/// otherwise it is kept as [`EvmError::Contract`].
pub fn handle_contract_error(err: alloy::contract::Error) -> EvmError {
    match err.as_revert_data() {
        Some(revert_data) => EvmError::DecodedRevert(describe_revert(&revert_data)),
        None => {
            debug!("No revert data in contract error");
            EvmError::Contract(err)
        }
    }
}

/// Same as [`handle_contract_error`] for raw JSON-RPC failures, e.g. a
/// gas estimation that reverted before the transaction was sent.
pub fn decode_rpc_error(err: RpcError<TransportErrorKind>) -> EvmError {
    // Wrap in alloy::contract::Error to reuse its revert data extraction
    let contract_err = alloy::contract::Error::TransportError(err);

    if contract_err.as_revert_data().is_some() {
        return handle_contract_error(contract_err);
    }

    match contract_err {
        alloy::contract::Error::TransportError(rpc_err) => EvmError::Transport(rpc_err),
        other => EvmError::Contract(other),
    }
}
