use std::io::Write;
use tracing::{info, info_span};

use crate::artifact::ContractArtifact;
use crate::config::Ctx;
use crate::fork::AnvilFork;
use crate::scenario::{Scenario, ScenarioReport};

pub mod artifact;
mod bindings;
pub mod config;
pub mod contract;
pub mod decode;
pub mod delegation;
pub mod fork;
pub mod scenario;
pub mod token;

pub use config::{Env, setup_tracing};

#[cfg(test)]
pub(crate) mod test_utils;

/// Runs the scenario against the configured node, or a freshly spawned
/// anvil when none is configured.
pub async fn launch<W: Write>(ctx: Ctx, stdout: &mut W) -> anyhow::Result<ScenarioReport> {
    let launch_span = info_span!("launch");
    let _enter = launch_span.enter();

    let artifact = ContractArtifact::load(&ctx.delegation_artifact)?;

    let fork_control = match ctx.node_endpoint {
        Some(endpoint) => {
            info!(%endpoint, "Using configured node");
            AnvilFork::connect(endpoint, ctx.confirmation)
        }
        None => AnvilFork::spawn(ctx.confirmation)?,
    };

    let scenario = Scenario::new(fork_control, ctx.fork, ctx.scenario, artifact);
    Ok(scenario.run(stdout).await?)
}
