//! # Block Driver
//!
//! Runs the ABCI block sequence on a timer with the local validator as sole
//! proposer and voter. After each commit, deferred transactions are checked
//! again against the new committed state.

use crate::adapters::abci_client::DEFERRABLE_TAG;
use crate::container::SharedStateMachine;
use crate::dev_chain::mempool::Mempool;
use pc_05_state_machine::{BeginBlockRequest, VoteInfo};
use poster_telemetry::{log_block_event, log_tx_event};
use shared_types::{Hash, NodeId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Result of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: u64,
    pub txs: usize,
    pub accepted: usize,
    pub app_hash: Hash,
}

pub struct BlockDriver {
    machine: SharedStateMachine,
    mempool: Arc<Mempool>,
    validator: NodeId,
    power: u64,
    max_block_txs: usize,
    interval: Duration,
}

impl BlockDriver {
    pub fn new(
        machine: SharedStateMachine,
        mempool: Arc<Mempool>,
        validator: NodeId,
        power: u64,
        max_block_txs: usize,
        interval: Duration,
    ) -> Self {
        Self {
            machine,
            mempool,
            validator,
            power,
            max_block_txs,
            interval,
        }
    }

    /// Produce one block from the mempool.
    pub fn produce_block(&self) -> BlockSummary {
        let txs = self.mempool.take(self.max_block_txs);
        let mut machine = self.machine.lock();
        let height = machine.commit_state().last_block_height + 1;

        machine.begin_block(BeginBlockRequest {
            height,
            proposer_address: self.validator,
            votes: vec![VoteInfo {
                validator: self.validator,
                power: self.power,
                signed_last_block: height > 1,
            }],
        });

        let mut accepted = 0;
        for raw in &txs {
            let response = machine.deliver_tx(raw);
            if response.is_ok() {
                accepted += 1;
            } else {
                log_tx_event!(
                    info,
                    "node",
                    "Transaction rejected in block",
                    response.code,
                    response.tag().unwrap_or_default(),
                    height = height
                );
            }
        }

        let updates = machine.end_block(height).validator_updates.len();
        let app_hash = machine.commit().data;

        for raw in self.mempool.take_deferred() {
            let response = machine.check_tx(&raw);
            let held = if response.is_ok() {
                self.mempool.push(raw)
            } else if response.tag() == Some(DEFERRABLE_TAG) && !self.mempool.is_empty() {
                self.mempool.defer(raw)
            } else {
                log_tx_event!(
                    info,
                    "node",
                    "Deferred transaction dropped",
                    response.code,
                    response.tag().unwrap_or_default(),
                    height = height
                );
                continue;
            };
            if let Err(err) = held {
                log_tx_event!(
                    warn,
                    "node",
                    "Deferred transaction dropped",
                    response.code,
                    response.tag().unwrap_or_default(),
                    error = %err
                );
            }
        }

        if !txs.is_empty() {
            log_block_event!(
                info,
                "node",
                "Block produced",
                height,
                txs = txs.len(),
                accepted = accepted,
                validator_updates = updates,
                app_hash = %hex::encode(app_hash)
            );
        }
        BlockSummary {
            height,
            txs: txs.len(),
            accepted,
            app_hash,
        }
    }

    /// Produce blocks until shutdown, then close the mempool and produce a
    /// final block from what is left.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.produce_block();
                }
                _ = shutdown.changed() => break,
            }
        }

        self.mempool.close();
        if !self.mempool.is_empty() {
            self.produce_block();
        }
        let height = self.machine.lock().commit_state().last_block_height;
        info!(height, "[node] Block driver stopped");
    }
}
