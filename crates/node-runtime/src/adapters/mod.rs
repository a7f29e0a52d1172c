//! # Adapters
//!
//! Port implementations connecting the state machine and the peg.
//!
//! - `PegRoundSync`: state machine `RoundSync` → peg round watch.
//! - `MempoolClient`: peg `AbciClient` → `checkTx` admission + local mempool.

pub mod abci_client;
pub mod round_sync;

pub use abci_client::MempoolClient;
pub use round_sync::PegRoundSync;
