//! # Order and Stream Handlers
//!
//! Both types carry a poster-signed order object. They differ only in which
//! quota they consume: orders take `orderLimit` and advance `orderCounter`,
//! streams take `streamLimit` and leave the counter alone.

use crate::domain::errors::{TxError, TxOutcome};
use crate::domain::order::Order;
use crate::ports::outbound::{OrderTracker, TrackedOrder};
use pc_03_state_store::{State, StateError};
use shared_types::{EthAddress, SignedTransaction, TxKind};
use tracing::debug;

/// Parse, size-check and recover the poster of an order payload.
fn parse_order(tx: &SignedTransaction, state: &State) -> Result<(Order, EthAddress), TxError> {
    let order = Order::from_value(&tx.data)?;

    let size = order.size();
    let limit = state.consensus_params.max_order_bytes;
    if size > limit {
        return Err(TxError::Oversized { size, limit });
    }

    let poster = order.recover_poster()?;
    Ok((order, poster))
}

fn no_stake(poster: EthAddress, kind: TxKind) -> TxError {
    TxError::NoStake {
        poster,
        quota: kind.as_str(),
    }
}

fn quota_error(err: StateError, kind: TxKind) -> TxError {
    match err {
        StateError::PosterNotFound(poster) | StateError::QuotaExhausted(poster) => {
            no_stake(poster, kind)
        }
        other => TxError::Format(other.to_string()),
    }
}

/// Admission check for an `order` transaction.
pub fn check_order(tx: &SignedTransaction, state: &State) -> Result<TxOutcome, TxError> {
    let (_, poster) = parse_order(tx, state)?;
    if state.order_quota(&poster) == 0 {
        return Err(no_stake(poster, TxKind::Order));
    }
    Ok(TxOutcome::Admitted(TxKind::Order))
}

/// Execute an `order` transaction: take one unit of quota, count it and
/// queue it for broadcast.
pub fn deliver_order(
    tx: &SignedTransaction,
    state: &mut State,
    tracker: &dyn OrderTracker,
) -> Result<TxOutcome, TxError> {
    let (order, poster) = parse_order(tx, state)?;
    let remaining = state
        .consume_order_quota(&poster)
        .map_err(|e| quota_error(e, TxKind::Order))?;

    let id = order.id();
    debug!(
        order_id = %id,
        %poster,
        remaining,
        order_counter = state.order_counter,
        "[pc-04] Order accepted"
    );
    tracker.add(TrackedOrder {
        id: id.clone(),
        kind: TxKind::Order,
        poster,
        order: order.to_json().clone(),
    });
    Ok(TxOutcome::OrderAccepted { id })
}

/// Admission check for a `stream` transaction.
pub fn check_stream(tx: &SignedTransaction, state: &State) -> Result<TxOutcome, TxError> {
    let (_, poster) = parse_order(tx, state)?;
    if state.stream_quota(&poster) == 0 {
        return Err(no_stake(poster, TxKind::Stream));
    }
    Ok(TxOutcome::Admitted(TxKind::Stream))
}

/// Execute a `stream` transaction.
pub fn deliver_stream(
    tx: &SignedTransaction,
    state: &mut State,
    tracker: &dyn OrderTracker,
) -> Result<TxOutcome, TxError> {
    let (order, poster) = parse_order(tx, state)?;
    state
        .consume_stream_quota(&poster)
        .map_err(|e| quota_error(e, TxKind::Stream))?;

    let id = order.id();
    debug!(stream_id = %id, %poster, "[pc-04] Stream accepted");
    tracker.add(TrackedOrder {
        id: id.clone(),
        kind: TxKind::Stream,
        poster,
        order: order.to_json().clone(),
    });
    Ok(TxOutcome::StreamAccepted { id })
}
