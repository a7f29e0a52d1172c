//! # Witness Handler
//!
//! Confirmation protocol for stake events observed on Ethereum.
//!
//! Each validator reports every event it sees in its own `witness`
//! transaction. Reports for the same `(block, id)` are counted as votes, one
//! per validator:
//!
//! ```text
//! no entry            → create, voters = {sender}
//! entry, same content → add sender to voters (repeat sender rejected)
//! entry, different    → reject (disagreement)
//! voters ≥ threshold  → apply to balances, delete entry, advance lastEvent
//! ```
//!
//! A report with no pending entry is stale when its block is below
//! `lastEvent[type]`, or equal to it and its id was already applied there.
//! Other events from the marked block stay acceptable, whether or not they
//! were reported before the mark moved.

use crate::domain::errors::{TxError, TxOutcome};
use pc_03_state_store::{PendingEvent, State};
use shared_types::{
    public_key_from_hex, NodeId, PublicKey, SignedTransaction, StakeSubject, TxKind, WitnessData,
};
use tracing::{debug, info, warn};

/// Parse and structurally validate a witness payload, including its id.
fn parse_witness(tx: &SignedTransaction) -> Result<(WitnessData, Option<PublicKey>), TxError> {
    let data: WitnessData = serde_json::from_value(tx.data.clone())
        .map_err(|e| TxError::Format(format!("witness: {e}")))?;

    let public_key = match (data.subject, data.public_key.as_deref()) {
        (StakeSubject::Validator, Some(key)) => Some(
            public_key_from_hex(key)
                .map_err(|e| TxError::Format(format!("witness publicKey: {e}")))?,
        ),
        (StakeSubject::Validator, None) => {
            return Err(TxError::Format(
                "validator events require a publicKey".into(),
            ))
        }
        (StakeSubject::Poster, Some(_)) => {
            return Err(TxError::Format(
                "poster events must not carry a publicKey".into(),
            ))
        }
        (StakeSubject::Poster, None) => None,
    };

    let computed = data.computed_id();
    if computed != data.id {
        return Err(TxError::IdMismatch {
            claimed: data.id,
            computed,
        });
    }

    Ok((data, public_key))
}

/// Reject reports that are stale or repeat the sender's earlier vote.
fn ensure_countable(data: &WitnessData, sender: &NodeId, state: &State) -> Result<(), TxError> {
    match state.events.get(data.block, &data.id) {
        Some(existing) if existing.has_voted(sender) => Err(TxError::DuplicateVote {
            voter: sender.to_hex(),
            id: data.id.clone(),
        }),
        Some(_) => Ok(()),
        None if state.last_event.is_stale(data.kind, data.block, &data.id) => {
            Err(TxError::Stale {
                kind: data.kind,
                block: data.block,
                last: state.last_event.get(data.kind),
            })
        }
        None => Ok(()),
    }
}

/// Admission check for a `witness` transaction sent by validator `sender`.
pub fn check_witness(
    tx: &SignedTransaction,
    sender: &NodeId,
    state: &State,
) -> Result<TxOutcome, TxError> {
    let (data, _) = parse_witness(tx)?;
    ensure_countable(&data, sender, state)?;
    Ok(TxOutcome::Admitted(TxKind::Witness))
}

/// Record `sender`'s witness vote, applying the event once it is confirmed.
pub fn deliver_witness(
    tx: &SignedTransaction,
    sender: &NodeId,
    state: &mut State,
) -> Result<TxOutcome, TxError> {
    let (data, public_key) = parse_witness(tx)?;
    ensure_countable(&data, sender, state)?;

    let threshold = state.consensus_params.confirmation_threshold;
    let conf = match state.events.get_mut(data.block, &data.id) {
        Some(existing) if existing.matches(data.kind, &data.amount) => {
            existing.vote(*sender);
            existing.conf
        }
        Some(_) => {
            return Err(TxError::Disagreement {
                block: data.block,
                id: data.id,
            })
        }
        None => {
            state.events.insert(
                data.block,
                data.id.clone(),
                PendingEvent::reported(
                    data.subject,
                    data.kind,
                    data.address,
                    data.amount,
                    data.public_key.clone(),
                    *sender,
                ),
            );
            1
        }
    };

    if conf < threshold {
        debug!(
            event_id = %data.id,
            block = data.block,
            voter = %sender,
            conf,
            threshold,
            "[pc-04] Witness vote recorded"
        );
        return Ok(TxOutcome::WitnessPending { id: data.id, conf });
    }

    apply_event(&data, public_key, state);
    Ok(TxOutcome::WitnessApplied { id: data.id })
}

fn apply_event(data: &WitnessData, public_key: Option<PublicKey>, state: &mut State) {
    let balance = match (data.subject, public_key) {
        (StakeSubject::Validator, Some(key)) => {
            state.apply_validator_stake(data.kind, key, data.address, data.amount)
        }
        _ => state.apply_poster_stake(data.kind, data.address, data.amount),
    };

    if let Err(err) = state.events.remove(data.block, &data.id) {
        warn!(error = %err, "[pc-04] Applied event had no pending entry");
    }
    state.last_event.advance(data.kind, data.block, &data.id);

    info!(
        event_id = %data.id,
        subject = data.subject.as_str(),
        kind = data.kind.as_str(),
        address = %data.address,
        amount = %data.amount,
        %balance,
        block = data.block,
        "[pc-04] Stake event applied"
    );
}
