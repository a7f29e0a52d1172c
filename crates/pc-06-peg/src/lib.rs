//! # Ethereum Peg (PC-06)
//!
//! Watches the staking contract on Ethereum and proposes the matching state
//! changes through consensus. The peg never touches application state
//! directly; everything it does goes through signed transactions.
//!
//! ## Data Flow
//!
//! ```text
//! EthereumProvider ──NewBlock/Stake──→ Peg reactor ──witness/rebalance──→ Broadcaster ──→ AbciClient
//!                                          ↑
//!                      PegHandle::synchronize(round)  (after each commit)
//! ```
//!
//! ## Finality Delay
//!
//! An event observed in block `b` is only reported once the chain head
//! reaches `b + finality_threshold`. Events already that deep when the peg
//! (re)connects are reported immediately.
//!
//! ## Failure Handling
//!
//! - Provider errors or a closed subscription: reconnect with exponential
//!   backoff, resuming from the last matured block.
//! - Broadcaster connection loss: fatal, the broadcaster task ends with an
//!   error.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::alloy_provider::{decode_stake_log, AlloyProvider};
pub use adapters::channel_provider::ChannelProvider;
pub use domain::config::PegConfig;
pub use domain::errors::{BroadcastError, PegError};
pub use domain::events::{EventBuffer, StakeEvent};
pub use domain::mirror::BalanceMirror;
pub use ports::outbound::{AbciClient, EthereumProvider, ProviderEvent, SubmitResponse, Subscription};
pub use service::broadcaster::{BroadcastQueue, Broadcaster, BroadcasterStats};
pub use service::peg::{Peg, PegHandle};
pub use service::tx_generator::TxGenerator;
