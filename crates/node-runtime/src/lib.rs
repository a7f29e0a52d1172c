//! # Node Runtime Library
//!
//! Exposes the runtime pieces for the binary and the integration tests.
//!
//! - `container/`: configuration and shared handle types
//! - `adapters/`: port implementations joining the state machine and the peg
//! - `dev_chain/`: mempool, block driver and dev Ethereum chain for a
//!   single-node network
//! - `runtime`: task wiring and shutdown

pub mod adapters;
pub mod container;
pub mod dev_chain;
pub mod runtime;

pub use container::{load_config, ConfigError, NodeConfig};
pub use runtime::{NodeRuntime, RuntimeTasks};
