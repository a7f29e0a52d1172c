//! # Transaction Outcomes and Errors
//!
//! Every rejection carries a stable tag (the first word of its message) that
//! ends up in the `log` field of the ABCI response.

use shared_types::{EthAddress, StakeKind, TxKind};
use std::fmt;
use thiserror::Error;

/// Why a transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    /// Wire bytes could not be decoded.
    #[error("decompress: {0}")]
    Decompress(String),

    /// Validator proof missing, invalid, or from an unknown validator.
    #[error("badSig: {0}")]
    BadSignature(String),

    /// Unknown transaction type tag.
    #[error("txType: unknown transaction type '{0}'")]
    UnknownType(String),

    /// Payload could not be parsed into its typed form.
    #[error("format: {0}")]
    Format(String),

    #[error("oversized: order is {size} bytes, limit is {limit}")]
    Oversized { size: usize, limit: usize },

    /// Poster has no remaining quota of the requested kind.
    #[error("noStake: poster {poster} has no remaining {quota} quota")]
    NoStake {
        poster: EthAddress,
        quota: &'static str,
    },

    /// Event at or below the last applied block of its kind.
    #[error("stale: {kind:?} event at block {block} is not after {last}")]
    Stale {
        kind: StakeKind,
        block: u64,
        last: u64,
    },

    #[error("idMismatch: claimed {claimed}, computed {computed}")]
    IdMismatch { claimed: String, computed: String },

    /// Validators reported different contents for the same event id.
    #[error("disagreement: conflicting reports for event {id} at block {block}")]
    Disagreement { block: u64, id: String },

    /// The sending validator has already reported this event.
    #[error("duplicateVote: {voter} already reported event {id}")]
    DuplicateVote { voter: String, id: String },

    #[error("round: expected round {expected}, got {actual}")]
    Round { expected: u64, actual: u64 },

    /// Proposed limit mapping differs from the locally computed one.
    #[error("limits: proposal for round {round} does not match local limits")]
    Limits { round: u64 },
}

impl TxError {
    /// Stable short tag for this error.
    pub fn tag(&self) -> &'static str {
        match self {
            TxError::Decompress(_) => "decompress",
            TxError::BadSignature(_) => "badSig",
            TxError::UnknownType(_) => "txType",
            TxError::Format(_) => "format",
            TxError::Oversized { .. } => "oversized",
            TxError::NoStake { .. } => "noStake",
            TxError::Stale { .. } => "stale",
            TxError::IdMismatch { .. } => "idMismatch",
            TxError::Disagreement { .. } => "disagreement",
            TxError::DuplicateVote { .. } => "duplicateVote",
            TxError::Round { .. } => "round",
            TxError::Limits { .. } => "limits",
        }
    }
}

/// Errors constructing or recovering an order object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("invalid order: {0}")]
    Invalid(String),

    #[error("invalid poster signature: {0}")]
    Signature(String),
}

impl From<OrderError> for TxError {
    fn from(err: OrderError) -> Self {
        TxError::Format(err.to_string())
    }
}

/// What an accepted transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Passed admission checks; nothing was executed.
    Admitted(TxKind),
    OrderAccepted {
        id: String,
    },
    StreamAccepted {
        id: String,
    },
    /// Vote recorded; the event is still below the confirmation threshold.
    WitnessPending {
        id: String,
        conf: u64,
    },
    /// Vote reached the threshold and the event was applied.
    WitnessApplied {
        id: String,
    },
    RoundAccepted {
        number: u64,
    },
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxOutcome::Admitted(kind) => write!(f, "{kind}: admitted"),
            TxOutcome::OrderAccepted { id } => write!(f, "order: accepted {id}"),
            TxOutcome::StreamAccepted { id } => write!(f, "stream: accepted {id}"),
            TxOutcome::WitnessPending { id, conf } => {
                write!(f, "witness: recorded {id} ({conf} confirmations)")
            }
            TxOutcome::WitnessApplied { id } => write!(f, "witness: applied {id}"),
            TxOutcome::RoundAccepted { number } => write!(f, "rebalance: round {number}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_starts_with_tag() {
        let errors = [
            TxError::Decompress("x".into()),
            TxError::BadSignature("x".into()),
            TxError::UnknownType("x".into()),
            TxError::Format("x".into()),
            TxError::Oversized { size: 2, limit: 1 },
            TxError::NoStake {
                poster: EthAddress::default(),
                quota: "order",
            },
            TxError::Stale {
                kind: StakeKind::Add,
                block: 1,
                last: 1,
            },
            TxError::IdMismatch {
                claimed: "a".into(),
                computed: "b".into(),
            },
            TxError::Disagreement {
                block: 1,
                id: "a".into(),
            },
            TxError::DuplicateVote {
                voter: "ab".into(),
                id: "a".into(),
            },
            TxError::Round {
                expected: 1,
                actual: 3,
            },
            TxError::Limits { round: 2 },
        ];
        for err in errors {
            assert!(
                err.to_string().starts_with(&format!("{}:", err.tag())),
                "{err}"
            );
        }
    }

    #[test]
    fn test_order_error_maps_to_format() {
        let err: TxError = OrderError::Invalid("missing subContract".into()).into();
        assert_eq!(err.tag(), "format");
    }
}
