//! # Poster-Chain Node
//!
//! Single-validator node: the ABCI state machine driven by a local block
//! timer, with the Ethereum peg witnessing a dev chain or, when
//! `PC_ETH_WS_URL` is set, an external node.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging
//! 2. Load configuration from `PC_*` variables
//! 3. Build the state machine and run `initChain`
//! 4. Spawn broadcaster, peg and block driver, plus the dev Ethereum miner
//!    when no external node is configured
//! 5. Run until Ctrl+C or a fatal broadcaster error

use anyhow::{Context, Result};
use node_runtime::{load_config, NodeRuntime};
use poster_telemetry::{init_logging, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env()).context("initializing logging")?;

    let config = load_config().context("loading configuration")?;
    info!(?config, "[node] Configuration loaded");

    let runtime = NodeRuntime::new(config)?;
    info!(node_id = %runtime.node_id(), "[node] Node is running. Press Ctrl+C to stop.");
    runtime.run_until_shutdown().await
}
