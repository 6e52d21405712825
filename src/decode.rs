//! Receipt log decoding against several candidate interfaces.
//!
//! A log is matched by its first topic against every non-anonymous event of
//! each candidate, in candidate order. The first event that decodes cleanly
//! wins; logs no candidate understands are kept as [`RawLog`] rather than
//! treated as failures.

use alloy::dyn_abi::{DynSolValue, EventExt as _};
use alloy::hex;
use alloy::json_abi::Event;
use alloy::primitives::{Address, B256, Bytes};
use alloy::rpc::types::{Log, TransactionReceipt};
use std::fmt;
use tracing::{debug, trace};

use crate::contract::ContractHandle;

/// A receipt log reduced to what decoding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub emitter: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: u64,
}

impl LogEntry {
    /// Converts an RPC log. `position` is used as the index when the node
    /// did not assign one.
    pub fn from_rpc(log: &Log, position: u64) -> Self {
        Self {
            emitter: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            log_index: log.log_index.unwrap_or(position),
        }
    }
}

/// All logs of a receipt, in receipt order.
pub fn receipt_logs(receipt: &TransactionReceipt) -> Vec<LogEntry> {
    receipt
        .inner
        .logs()
        .iter()
        .zip(0_u64..)
        .map(|(log, position)| LogEntry::from_rpc(log, position))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventArgument {
    pub name: String,
    /// Solidity type as declared in the ABI.
    pub ty: String,
    pub indexed: bool,
    pub value: DynSolValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub log_index: u64,
    pub emitter: Address,
    pub source_label: String,
    pub event_name: String,
    /// In declaration order, indexed and non-indexed interleaved.
    pub arguments: Vec<EventArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub log_index: u64,
    pub emitter: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLog {
    Event(DecodedEvent),
    Raw(RawLog),
}

impl DecodedLog {
    pub const fn log_index(&self) -> u64 {
        match self {
            Self::Event(event) => event.log_index,
            Self::Raw(raw) => raw.log_index,
        }
    }
}

/// Decodes one log with the first matching candidate.
pub fn decode(log: &LogEntry, candidates: &[ContractHandle]) -> DecodedLog {
    let Some(topic0) = log.topics.first() else {
        trace!(log_index = log.log_index, "Log has no topics");
        return DecodedLog::Raw(raw(log));
    };

    for candidate in candidates {
        for event in candidate.interface.abi.events() {
            if event.anonymous || event.selector() != *topic0 {
                continue;
            }

            match decode_event(event, log, candidate) {
                Ok(decoded) => return DecodedLog::Event(decoded),
                Err(error) => {
                    debug!(
                        log_index = log.log_index,
                        interface = %candidate.interface.name,
                        event = %event.name,
                        %error,
                        "Selector matched but log did not decode"
                    );
                }
            }
        }
    }

    DecodedLog::Raw(raw(log))
}

/// Decodes every log, ordered by log index.
pub fn decode_all(
    logs: impl IntoIterator<Item = LogEntry>,
    candidates: &[ContractHandle],
) -> Vec<DecodedLog> {
    let mut logs: Vec<LogEntry> = logs.into_iter().collect();
    logs.sort_by_key(|log| log.log_index);

    logs.iter().map(|log| decode(log, candidates)).collect()
}

fn decode_event(
    event: &Event,
    log: &LogEntry,
    candidate: &ContractHandle,
) -> Result<DecodedEvent, alloy::dyn_abi::Error> {
    let decoded = event.decode_log_parts(log.topics.iter().copied(), &log.data)?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();

    let arguments = event
        .inputs
        .iter()
        .filter_map(|param| {
            let value = if param.indexed {
                indexed.next()
            } else {
                body.next()
            }?;

            Some(EventArgument {
                name: param.name.clone(),
                ty: param.ty.clone(),
                indexed: param.indexed,
                value,
            })
        })
        .collect();

    let source_label = if log.emitter == candidate.address {
        candidate.label.clone()
    } else {
        candidate.interface.name.clone()
    };

    Ok(DecodedEvent {
        log_index: log.log_index,
        emitter: log.emitter,
        source_label,
        event_name: event.name.clone(),
        arguments,
    })
}

fn raw(log: &LogEntry) -> RawLog {
    RawLog {
        log_index: log.log_index,
        emitter: log.emitter,
        topics: log.topics.clone(),
        data: log.data.clone(),
    }
}

/// Human-readable rendering of a decoded value.
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Bool(flag) => flag.to_string(),
        DynSolValue::Int(int, _) => int.to_string(),
        DynSolValue::Uint(uint, _) => uint.to_string(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Function(function) => hex::encode_prefixed(function),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::String(string) => string.clone(),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            format!("[{}]", join_values(values))
        }
        // Tuples and, with EIP-712 support enabled, custom structs.
        other => other
            .as_fixed_seq()
            .map(|values| format!("({})", join_values(values)))
            .unwrap_or_default(),
    }
}

fn join_values(values: &[DynSolValue]) -> String {
    values
        .iter()
        .map(format_value)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for DecodedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event {} {}(\n    contract {} {}",
            self.log_index, self.event_name, self.source_label, self.emitter
        )?;

        for argument in &self.arguments {
            let indexed = if argument.indexed { " indexed" } else { "" };
            write!(
                f,
                ",\n    {}{indexed} {}: {}",
                argument.ty,
                argument.name,
                format_value(&argument.value)
            )?;
        }

        write!(f, ")")
    }
}

impl fmt::Display for RawLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics = serde_json::to_string(&self.topics).map_err(|_| fmt::Error)?;
        write!(
            f,
            "Log {} {} {topics} \"{}\"",
            self.log_index, self.emitter, self.data
        )
    }
}

impl fmt::Display for DecodedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => event.fmt(f),
            Self::Raw(raw) => raw.fmt(f),
        }
    }
}
