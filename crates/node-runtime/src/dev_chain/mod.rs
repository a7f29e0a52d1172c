//! # Single-Node Chain
//!
//! Stands in for the consensus engine and Ethereum when running one
//! validator locally:
//!
//! - `mempool`: FIFO of transactions admitted by `checkTx`.
//! - `driver`: produces a block per tick, `beginBlock → deliverTx* →
//!   endBlock → commit`.
//! - `eth`: mines dev Ethereum blocks on a [`pc_06_peg::ChannelProvider`].

pub mod driver;
pub mod eth;
pub mod mempool;

pub use driver::{BlockDriver, BlockSummary};
pub use eth::EthMiner;
pub use mempool::{Mempool, MempoolError};
