//! # Outbound Ports (Driven Ports / SPI)
//!
//! Connections the peg needs: an Ethereum node for staking events and the
//! local consensus engine for submitting transactions.

use crate::domain::errors::{BroadcastError, PegError};
use crate::domain::events::StakeEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Items delivered by a provider subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A new chain head.
    NewBlock(u64),
    /// A staking contract event.
    Stake(StakeEvent),
    /// The subscription failed; the peg reconnects.
    Error(String),
}

/// Live event stream from a provider. Closing the channel ends the session.
pub type Subscription = mpsc::Receiver<ProviderEvent>;

/// Ethereum node access.
#[async_trait]
pub trait EthereumProvider: Send + Sync {
    /// Open a stream of new heads and staking events.
    async fn subscribe(&self) -> Result<Subscription, PegError>;

    /// Staking events in blocks `from..=to`.
    async fn past_events(&self, from: u64, to: u64) -> Result<Vec<StakeEvent>, PegError>;

    /// Current chain head.
    async fn block_number(&self) -> Result<u64, PegError>;
}

/// Result of a `broadcast_tx_sync`-style submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub code: u32,
    pub log: String,
}

impl SubmitResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Local consensus engine endpoint.
#[async_trait]
pub trait AbciClient: Send + Sync {
    /// Submit encoded transaction bytes and wait for the admission result.
    async fn submit(&self, raw: Vec<u8>) -> Result<SubmitResponse, BroadcastError>;
}
