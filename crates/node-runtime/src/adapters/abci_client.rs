//! # Mempool Client
//!
//! [`AbciClient`] for the single-node chain: runs `checkTx` against committed
//! state and queues admitted transactions for the block driver, like a
//! consensus engine's `broadcast_tx_sync`.
//!
//! A rebalance refused with `limits` may only be waiting on witnesses already
//! in the mempool, so it is held and checked again after the next commit.

use crate::container::SharedStateMachine;
use crate::dev_chain::mempool::{Mempool, MempoolError};
use async_trait::async_trait;
use pc_06_peg::{AbciClient, BroadcastError, SubmitResponse};
use poster_telemetry::log_tx_event;
use std::sync::Arc;

pub struct MempoolClient {
    machine: SharedStateMachine,
    mempool: Arc<Mempool>,
}

impl MempoolClient {
    pub fn new(machine: SharedStateMachine, mempool: Arc<Mempool>) -> Self {
        Self { machine, mempool }
    }

    /// Admission shared by the peg and external submitters.
    pub fn admit(&self, raw: Vec<u8>) -> Result<SubmitResponse, BroadcastError> {
        let response = self.machine.lock().check_tx(&raw);
        if response.tag() == Some(DEFERRABLE_TAG) && !self.mempool.is_empty() {
            return match self.mempool.defer(raw) {
                Ok(()) => {
                    log_tx_event!(
                        debug,
                        "node",
                        "Transaction deferred to next block",
                        response.code,
                        DEFERRABLE_TAG
                    );
                    Ok(SubmitResponse {
                        code: pc_05_state_machine::CODE_OK,
                        log: format!("deferred: {}", response.log),
                    })
                }
                Err(err) => Self::mempool_refusal(err),
            };
        }
        if !response.is_ok() {
            log_tx_event!(
                debug,
                "node",
                "Transaction refused by checkTx",
                response.code,
                response.tag().unwrap_or_default()
            );
            return Ok(SubmitResponse {
                code: response.code,
                log: response.log,
            });
        }

        match self.mempool.push(raw) {
            Ok(()) => Ok(SubmitResponse {
                code: response.code,
                log: response.log,
            }),
            Err(err) => Self::mempool_refusal(err),
        }
    }

    fn mempool_refusal(err: MempoolError) -> Result<SubmitResponse, BroadcastError> {
        match err {
            MempoolError::Full { capacity } => Ok(SubmitResponse {
                code: pc_05_state_machine::CODE_REJECTED,
                log: format!("mempool: full ({capacity} transactions)"),
            }),
            MempoolError::Closed => Err(BroadcastError::Connection("mempool closed".into())),
        }
    }
}

/// Rejection tag worth a second check once queued transactions commit.
pub(crate) const DEFERRABLE_TAG: &str = "limits";

#[async_trait]
impl AbciClient for MempoolClient {
    async fn submit(&self, raw: Vec<u8>) -> Result<SubmitResponse, BroadcastError> {
        self.admit(raw)
    }
}
