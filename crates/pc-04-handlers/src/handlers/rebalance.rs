//! # Rebalance Handler
//!
//! Accepts the proposal for the next rate-limit round.
//!
//! - The proposal must be for round `state.round.number + 1`.
//! - The first proposal (0 → 1) only sets the period boundaries; no balances
//!   exist before it, so its `limits` are ignored.
//! - Later proposals must carry exactly [`limits_for_state`].

use crate::domain::errors::{TxError, TxOutcome};
use crate::domain::limits::limits_for_state;
use pc_03_state_store::State;
use shared_types::{RebalanceData, SignedTransaction, TxKind};
use tracing::info;

fn validate(tx: &SignedTransaction, state: &State) -> Result<RebalanceData, TxError> {
    let proposal: RebalanceData = serde_json::from_value(tx.data.clone())
        .map_err(|e| TxError::Format(format!("rebalance: {e}")))?;

    let expected = state.round.number + 1;
    if proposal.round.number != expected {
        return Err(TxError::Round {
            expected,
            actual: proposal.round.number,
        });
    }

    if state.round.number > 0 && proposal.limits != limits_for_state(state) {
        return Err(TxError::Limits {
            round: proposal.round.number,
        });
    }

    Ok(proposal)
}

/// Admission check for a `rebalance` transaction.
pub fn check_rebalance(tx: &SignedTransaction, state: &State) -> Result<TxOutcome, TxError> {
    validate(tx, state)?;
    Ok(TxOutcome::Admitted(TxKind::Rebalance))
}

/// Advance the round and overwrite poster quotas.
pub fn deliver_rebalance(tx: &SignedTransaction, state: &mut State) -> Result<TxOutcome, TxError> {
    let proposal = validate(tx, state)?;
    let genesis = state.round.number == 0;

    let limits = (!genesis).then_some(&proposal.limits);
    state.apply_round(proposal.round, limits);

    info!(
        round = proposal.round.number,
        starts_at = proposal.round.starts_at,
        ends_at = proposal.round.ends_at,
        limit = proposal.round.limit,
        posters = proposal.limits.len(),
        "[pc-04] Round accepted"
    );
    Ok(TxOutcome::RoundAccepted {
        number: proposal.round.number,
    })
}
