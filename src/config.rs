//! Scenario configuration: plaintext TOML plus the fork source endpoint
//! from the environment, assembled into a runtime [`Ctx`].

use alloy::primitives::{Address, U256};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use url::Url;

use credit_delegation_evm::Confirmation;

use crate::fork::ForkSpec;

const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 10_000_000;
const DEFAULT_DEPOSIT_GAS_LIMIT: u64 = 1_000_000;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long, default_value = "config/kovan.toml")]
    pub config: PathBuf,
    /// JSON-RPC endpoint of the network to fork. Usually embeds a provider
    /// API key, so it is not part of the config file.
    #[clap(long, env = "FORK_RPC_URL")]
    pub fork_rpc_url: Option<Url>,
}

impl Env {
    pub fn into_ctx(self) -> Result<Ctx, ConfigError> {
        Ctx::load_file(&self.config, self.fork_rpc_url)
    }
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    log_level: Option<LogLevel>,
    required_confirmations: Option<u64>,
    confirmation_timeout_secs: Option<u64>,
    node: Option<NodeConfig>,
    fork: Option<ForkConfig>,
    scenario: ScenarioConfig,
    delegation: DelegationConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeConfig {
    endpoint: Option<Url>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ForkConfig {
    block_number: Option<u64>,
}

// Addresses and amounts stay strings here so they can be validated with
// field-specific errors.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioConfig {
    holder: String,
    token: String,
    token_label: Option<String>,
    lending_pool: String,
    approval_amount: String,
    deposit_amount: String,
    use_as_collateral: Option<bool>,
    deploy_gas_limit: Option<u64>,
    deposit_gas_limit: Option<u64>,
    gas_price: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DelegationConfig {
    artifact: PathBuf,
}

// ===== Runtime types =====

/// Combined runtime context for a scenario run.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub confirmation: Confirmation,
    /// `None` spawns a local anvil node for the run.
    pub node_endpoint: Option<Url>,
    pub fork: ForkSpec,
    pub scenario: ScenarioCtx,
    pub delegation_artifact: PathBuf,
}

/// Accounts, contracts and amounts the scenario operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCtx {
    pub holder: Address,
    pub token: Address,
    /// Label used when rendering events emitted by the token itself.
    pub token_label: String,
    pub lending_pool: Address,
    pub approval_amount: U256,
    pub deposit_amount: U256,
    pub use_as_collateral: bool,
    pub deploy_gas_limit: u64,
    pub deposit_gas_limit: u64,
    /// Legacy gas price for every submitted transaction. `None` lets the
    /// node price them.
    pub gas_price: Option<u128>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        (*log_level).into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error("fork RPC URL missing: pass --fork-rpc-url or set FORK_RPC_URL")]
    MissingForkRpcUrl,
    #[error("{field} is not a valid address: {value:?}")]
    MalformedAddress { field: &'static str, value: String },
    #[error("{field} is not a valid token amount: {value:?}")]
    InvalidAmount { field: &'static str, value: String },
}

impl Ctx {
    pub fn load_file(config: &Path, fork_rpc_url: Option<Url>) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        Self::from_toml(&config_str, fork_rpc_url)
    }

    pub fn from_toml(config_toml: &str, fork_rpc_url: Option<Url>) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;

        let source_rpc_url = fork_rpc_url.ok_or(ConfigError::MissingForkRpcUrl)?;
        let fork = ForkSpec {
            source_rpc_url,
            block_number: config.fork.and_then(|fork| fork.block_number),
        };

        let timeout_secs = config
            .confirmation_timeout_secs
            .unwrap_or(DEFAULT_CONFIRMATION_TIMEOUT_SECS);
        let confirmation = Confirmation::new(
            config.required_confirmations.unwrap_or(1),
            Some(Duration::from_secs(timeout_secs)),
        );

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            confirmation,
            node_endpoint: config.node.and_then(|node| node.endpoint),
            fork,
            scenario: assemble_scenario(config.scenario)?,
            delegation_artifact: config.delegation.artifact,
        })
    }
}

fn assemble_scenario(scenario: ScenarioConfig) -> Result<ScenarioCtx, ConfigError> {
    Ok(ScenarioCtx {
        holder: parse_address("scenario.holder", &scenario.holder)?,
        token: parse_address("scenario.token", &scenario.token)?,
        token_label: scenario.token_label.unwrap_or_else(|| "token".to_owned()),
        lending_pool: parse_address("scenario.lending_pool", &scenario.lending_pool)?,
        approval_amount: parse_amount("scenario.approval_amount", &scenario.approval_amount)?,
        deposit_amount: parse_amount("scenario.deposit_amount", &scenario.deposit_amount)?,
        use_as_collateral: scenario.use_as_collateral.unwrap_or(true),
        deploy_gas_limit: scenario
            .deploy_gas_limit
            .unwrap_or(DEFAULT_DEPLOY_GAS_LIMIT),
        deposit_gas_limit: scenario
            .deposit_gas_limit
            .unwrap_or(DEFAULT_DEPOSIT_GAS_LIMIT),
        gas_price: scenario.gas_price.map(u128::from),
    })
}

/// Parses a 20-byte hex address. All-lowercase and all-uppercase input is
/// accepted as is; mixed case must carry a valid EIP-55 checksum.
fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    let malformed = || ConfigError::MalformedAddress {
        field,
        value: value.to_owned(),
    };

    let digits = value.strip_prefix("0x").unwrap_or(value);
    let address: Address = digits.parse().map_err(|_| malformed())?;

    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        Address::parse_checksummed(format!("0x{digits}"), None).map_err(|_| malformed())?;
    }

    Ok(address)
}

/// Parses a base-unit token amount, decimal or `0x` hex.
fn parse_amount(field: &'static str, value: &str) -> Result<U256, ConfigError> {
    value
        .trim()
        .parse::<U256>()
        .map_err(|_| ConfigError::InvalidAmount {
            field,
            value: value.to_owned(),
        })
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("credit_delegation={level},credit_delegation_evm={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
