//! # Node Container
//!
//! Configuration and the shared handles every task is built from.

pub mod config;

pub use config::{
    load_config, load_config_from, AbciConfig, ConfigError, ConsensusConfig, DevChainConfig,
    EthereumConfig, NodeConfig, PegConfig, ValidatorKeyConfig,
};

use crate::adapters::PegRoundSync;
use parking_lot::Mutex;
use pc_04_handlers::QueuedOrderTracker;
use pc_05_state_machine::StateMachine;
use std::sync::Arc;

/// The application as wired in this node.
pub type NodeStateMachine = StateMachine<QueuedOrderTracker, PegRoundSync>;

/// State machine shared by the block driver and the admission path. All
/// state machine calls are synchronous, so a blocking mutex is enough.
pub type SharedStateMachine = Arc<Mutex<NodeStateMachine>>;
