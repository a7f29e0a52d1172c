//! # State Machine (PC-05)
//!
//! The ABCI application: drives the transaction handlers through the block
//! lifecycle and keeps the two state instances in step.
//!
//! ## Lifecycle
//!
//! ```text
//! info
//! initChain ─→ ┌─ beginBlock ─→ deliverTx* ─→ endBlock ─→ commit ─┐
//!              └──────────────────────────────────────────────────┘
//!                  checkTx* (any time, against committed state)
//! ```
//!
//! ## State Discipline
//!
//! | Call | State touched |
//! |------|---------------|
//! | `check_tx`, `query`, `info` | committed, read-only |
//! | `begin_block`, `deliver_tx`, `end_block` | speculative |
//! | `commit` | speculative → committed (deep copy) |
//!
//! Mutating calls take `&mut self`, so the host cannot interleave them.
//!
//! ## Failure Policy
//!
//! Nothing escapes the ABCI surface. Transaction failures become a
//! [`TxResponse`] with `code = 1`; commit failures are logged and the last
//! committed app hash is returned.

pub mod domain;
pub mod ports;
pub mod query;
pub mod service;

pub use domain::abci::*;
pub use domain::config::{RoundDriftPolicy, StateMachineConfig};
pub use domain::errors::CommitError;
pub use ports::outbound::{NoRoundSync, NoValidatorUpdates, RoundSync, ValidatorPowerPolicy};
pub use service::StateMachine;
