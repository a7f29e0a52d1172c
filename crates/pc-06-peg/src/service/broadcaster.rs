//! # Broadcaster
//!
//! Serializes submissions to the consensus engine: transactions are queued
//! and submitted one at a time, in order. A rejected transaction is logged
//! and skipped. Losing the connection ends the task.

use crate::domain::errors::{BroadcastError, PegError};
use crate::ports::outbound::AbciClient;
use shared_types::SignedTransaction;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Sending side of the submission queue.
#[derive(Clone)]
pub struct BroadcastQueue {
    sender: mpsc::UnboundedSender<SignedTransaction>,
}

impl BroadcastQueue {
    /// Queue a transaction for submission.
    pub fn push(&self, tx: SignedTransaction) -> Result<(), PegError> {
        self.sender
            .send(tx)
            .map_err(|_| PegError::BroadcasterClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Submission counters returned when the queue drains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcasterStats {
    pub accepted: u64,
    pub rejected: u64,
}

pub struct Broadcaster<C: AbciClient> {
    client: Arc<C>,
    queue: mpsc::UnboundedReceiver<SignedTransaction>,
    stats: BroadcasterStats,
}

impl<C: AbciClient> Broadcaster<C> {
    pub fn new(client: Arc<C>) -> (Self, BroadcastQueue) {
        let (sender, queue) = mpsc::unbounded_channel();
        (
            Self {
                client,
                queue,
                stats: BroadcasterStats::default(),
            },
            BroadcastQueue { sender },
        )
    }

    #[cfg(test)]
    pub(crate) fn into_receiver(self) -> mpsc::UnboundedReceiver<SignedTransaction> {
        self.queue
    }

    /// Submit queued transactions until every queue handle is dropped.
    pub async fn run(mut self) -> Result<BroadcasterStats, BroadcastError> {
        info!("[pc-06] Broadcaster started");
        while let Some(tx) = self.queue.recv().await {
            self.submit(&tx).await?;
        }
        info!(
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            "[pc-06] Broadcaster stopped"
        );
        Ok(self.stats)
    }

    async fn submit(&mut self, tx: &SignedTransaction) -> Result<(), BroadcastError> {
        let kind = tx.tx_type.as_str();
        let raw = match pc_01_codec::encode(tx) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(kind = %kind, error = %e, "[pc-06] Dropping unencodable transaction");
                self.stats.rejected += 1;
                return Ok(());
            }
        };

        match self.client.submit(raw.into_bytes()).await {
            Ok(response) if response.is_ok() => {
                debug!(kind = %kind, "[pc-06] Transaction admitted");
                self.stats.accepted += 1;
            }
            Ok(response) => {
                warn!(kind = %kind, code = response.code, log = %response.log, "[pc-06] Transaction rejected");
                self.stats.rejected += 1;
            }
            Err(BroadcastError::Connection(reason)) => {
                error!(%reason, "[pc-06] Lost connection to consensus engine");
                return Err(BroadcastError::Connection(reason));
            }
            Err(other) => {
                warn!(kind = %kind, error = %other, "[pc-06] Submission failed");
                self.stats.rejected += 1;
            }
        }
        Ok(())
    }
}
