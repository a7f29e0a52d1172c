//! # State Machine Service
//!
//! Owns both state instances and implements the ABCI lifecycle over them.

use crate::domain::abci::{
    BeginBlockRequest, CommitResponse, EndBlockResponse, InfoResponse, InitChainRequest,
    TxResponse,
};
use crate::domain::config::{RoundDriftPolicy, StateMachineConfig};
use crate::domain::errors::CommitError;
use crate::ports::outbound::{NoValidatorUpdates, RoundSync, ValidatorPowerPolicy};
use pc_02_signer::verify_sender;
use pc_03_state_store::{compute_state_hash, ConsensusParams, State, Validator};
use pc_04_handlers::{
    check_order, check_rebalance, check_stream, check_witness, deliver_order, deliver_rebalance,
    deliver_stream, deliver_witness, OrderTracker, TxError, TxOutcome,
};
use shared_types::{Hash, NodeId, SignedTransaction, TxKind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Text reported in `info().data`.
pub const APP_NAME: &str = "poster-chain";

/// The ABCI application.
pub struct StateMachine<T: OrderTracker, R: RoundSync> {
    pub(crate) deliver_state: State,
    pub(crate) commit_state: State,
    config: StateMachineConfig,
    tracker: Arc<T>,
    round_sync: R,
    power_policy: Box<dyn ValidatorPowerPolicy>,
}

impl<T: OrderTracker, R: RoundSync> StateMachine<T, R> {
    /// Create a state machine with both states built from the genesis
    /// template.
    pub fn new(
        config: StateMachineConfig,
        consensus_params: ConsensusParams,
        tracker: Arc<T>,
        round_sync: R,
    ) -> Self {
        let genesis = State::new(consensus_params);
        Self {
            deliver_state: genesis.clone(),
            commit_state: genesis,
            config,
            tracker,
            round_sync,
            power_policy: Box::new(NoValidatorUpdates),
        }
    }

    /// Replace the end-block validator power policy.
    pub fn with_power_policy(mut self, policy: Box<dyn ValidatorPowerPolicy>) -> Self {
        self.power_policy = policy;
        self
    }

    /// Speculative state of the block in progress.
    pub fn deliver_state(&self) -> &State {
        &self.deliver_state
    }

    /// Last committed state.
    pub fn commit_state(&self) -> &State {
        &self.commit_state
    }

    pub fn tracker(&self) -> &Arc<T> {
        &self.tracker
    }

    // =========================================================================
    // ABCI: CONNECTION SETUP
    // =========================================================================

    pub fn info(&self) -> InfoResponse {
        InfoResponse {
            data: APP_NAME.to_string(),
            version: self.config.version.clone(),
            last_block_height: self.commit_state.last_block_height,
            last_block_app_hash: self.commit_state.last_block_app_hash,
        }
    }

    /// Load the genesis validator set and sync both states.
    pub fn init_chain(&mut self, request: InitChainRequest) {
        for update in &request.validators {
            let node_id = NodeId::from_public_key(&update.pub_key);
            self.deliver_state
                .validators
                .insert(node_id, Validator::genesis(update.pub_key, update.power));
        }
        self.commit_state = self.deliver_state.clone();

        info!(
            validators = request.validators.len(),
            confirmation_threshold = self.deliver_state.consensus_params.confirmation_threshold,
            "[pc-05] Chain initialised"
        );
    }

    // =========================================================================
    // ABCI: BLOCK EXECUTION
    // =========================================================================

    /// Update validator bookkeeping from the previous block's votes and
    /// recompute the confirmation threshold.
    pub fn begin_block(&mut self, request: BeginBlockRequest) {
        let height = request.height;
        let state = &mut self.deliver_state;

        if let Some(proposer) = state.validators.get_mut(&request.proposer_address) {
            proposer.last_proposed = height;
        }

        if !request.votes.is_empty() {
            for validator in state.validators.values_mut() {
                validator.active = false;
            }
            for vote in &request.votes {
                if let Some(validator) = state.validators.get_mut(&vote.validator) {
                    validator.power = vote.power;
                    validator.active = true;
                    if vote.signed_last_block {
                        validator.total_votes += 1;
                        validator.last_voted = height;
                    }
                }
            }
        }

        let active = state.active_validator_count() as u64;
        let threshold = ((2 * active) / 3).max(1);
        state.consensus_params.confirmation_threshold = threshold;

        debug!(height, active, threshold, "[pc-05] Block started");
    }

    /// Mempool admission against committed state. Never mutates anything.
    pub fn check_tx(&self, raw: &[u8]) -> TxResponse {
        let result = authenticate(raw, &self.commit_state).and_then(|(kind, tx, sender)| {
            let state = &self.commit_state;
            match kind {
                TxKind::Order => check_order(&tx, state),
                TxKind::Stream => check_stream(&tx, state),
                TxKind::Witness => check_witness(&tx, &validator_sender(sender)?, state),
                TxKind::Rebalance => check_rebalance(&tx, state),
            }
        });
        respond("checkTx", result)
    }

    /// Execute a transaction against speculative state.
    pub fn deliver_tx(&mut self, raw: &[u8]) -> TxResponse {
        let result = authenticate(raw, &self.deliver_state).and_then(|(kind, tx, sender)| {
            let state = &mut self.deliver_state;
            let tracker = self.tracker.as_ref();
            match kind {
                TxKind::Order => deliver_order(&tx, state, tracker),
                TxKind::Stream => deliver_stream(&tx, state, tracker),
                TxKind::Witness => deliver_witness(&tx, &validator_sender(sender)?, state),
                TxKind::Rebalance => deliver_rebalance(&tx, state),
            }
        });
        respond("deliverTx", result)
    }

    /// Consult the validator power policy.
    pub fn end_block(&mut self, height: u64) -> EndBlockResponse {
        let validator_updates = self
            .power_policy
            .validator_updates(&mut self.deliver_state, height);
        if !validator_updates.is_empty() {
            info!(
                height,
                updates = validator_updates.len(),
                "[pc-05] Validator updates"
            );
        }
        EndBlockResponse { validator_updates }
    }

    /// Finalise the block. Never fails: on error the previous app hash is
    /// returned.
    pub fn commit(&mut self) -> CommitResponse {
        match self.try_commit() {
            Ok(hash) => CommitResponse { data: hash },
            Err(err) => {
                error!(error = %err, "[pc-05] Commit failed, returning previous app hash");
                self.deliver_state = self.commit_state.clone();
                self.tracker.discard();
                CommitResponse {
                    data: self.commit_state.last_block_app_hash,
                }
            }
        }
    }

    /// The fallible commit sequence.
    pub fn try_commit(&mut self) -> Result<Hash, CommitError> {
        let committed = self.commit_state.round.number;
        let delivered = self.deliver_state.round.number;

        match delivered.checked_sub(committed) {
            None => return Err(CommitError::RoundRegressed { committed, delivered }),
            Some(0) => {}
            Some(1) => self.round_sync.synchronize(self.deliver_state.round),
            Some(_) => match self.config.round_drift_policy {
                RoundDriftPolicy::Warn => {
                    warn!(committed, delivered, "[pc-05] Delivered state is more than one round ahead");
                    self.round_sync.synchronize(self.deliver_state.round);
                }
                RoundDriftPolicy::Strict => {
                    return Err(CommitError::RoundDrift { committed, delivered })
                }
            },
        }

        self.deliver_state.last_block_height += 1;
        let hash = compute_state_hash(&self.deliver_state);
        self.deliver_state.last_block_app_hash = hash;

        let broadcast = self.tracker.flush();
        self.commit_state = self.deliver_state.clone();

        info!(
            height = self.commit_state.last_block_height,
            app_hash = %hex::encode(hash),
            orders = broadcast,
            round = delivered,
            "[pc-05] Block committed"
        );
        Ok(hash)
    }
}

/// Decode the wire bytes and, for validator-originated types, check the
/// proof against the known validator set. Returns the sending validator for
/// those types.
fn authenticate(
    raw: &[u8],
    state: &State,
) -> Result<(TxKind, SignedTransaction, Option<NodeId>), TxError> {
    let tx = pc_01_codec::decode(raw).map_err(|e| TxError::Decompress(e.to_string()))?;
    let kind = tx.kind().map_err(|e| TxError::UnknownType(e.0))?;

    if kind.is_externally_signed() {
        return Ok((kind, tx, None));
    }
    let node_id = verify_sender(&tx).map_err(|e| TxError::BadSignature(e.to_string()))?;
    if !state.is_validator(&node_id) {
        return Err(TxError::BadSignature(format!(
            "{node_id} is not a known validator"
        )));
    }
    Ok((kind, tx, Some(node_id)))
}

fn validator_sender(sender: Option<NodeId>) -> Result<NodeId, TxError> {
    sender.ok_or_else(|| TxError::BadSignature("validator proof required".into()))
}

fn respond(phase: &'static str, result: Result<TxOutcome, TxError>) -> TxResponse {
    match result {
        Ok(outcome) => {
            debug!(phase, outcome = %outcome, "[pc-05] Transaction accepted");
            TxResponse::accepted(&outcome)
        }
        Err(err) => {
            debug!(phase, tag = err.tag(), error = %err, "[pc-05] Transaction rejected");
            TxResponse::rejected(&err)
        }
    }
}
