//! # Shape Checks
//!
//! Structural validation performed before a validator signs a transaction.
//! These checks look only at which fields exist and their JSON types; value
//! semantics (stale blocks, round numbers, quotas) are the handlers' job.

use super::errors::SignerError;
use serde_json::{Map, Value};
use shared_types::TxKind;

/// Fields a witness payload must carry.
const WITNESS_REQUIRED: [&str; 6] = ["subject", "type", "amount", "block", "address", "id"];

/// Fields a witness payload may carry.
const WITNESS_ALLOWED: [&str; 7] = [
    "subject",
    "type",
    "amount",
    "block",
    "address",
    "publicKey",
    "id",
];

/// Fields a rebalance `round` object must carry.
const ROUND_REQUIRED: [&str; 4] = ["endsAt", "startsAt", "number", "limit"];

/// Check that `data` has the structure `kind` requires.
pub fn validate_shape(kind: TxKind, data: &Value) -> Result<(), SignerError> {
    let malformed = |reason: &str| SignerError::MalformedTransaction {
        kind,
        reason: reason.to_string(),
    };
    let object = data
        .as_object()
        .ok_or_else(|| malformed("payload must be an object"))?;

    match kind {
        TxKind::Order | TxKind::Stream => {
            if !object.get("posterSignature").is_some_and(Value::is_object) {
                return Err(malformed("missing posterSignature object"));
            }
            if !object.get("subContract").is_some_and(Value::is_string) {
                return Err(malformed("missing subContract string"));
            }
        }
        TxKind::Witness => {
            if let Some(missing) = WITNESS_REQUIRED.iter().find(|f| !object.contains_key(**f)) {
                return Err(malformed(&format!("missing field '{missing}'")));
            }
            if let Some(extra) = object
                .keys()
                .find(|k| !WITNESS_ALLOWED.contains(&k.as_str()))
            {
                return Err(malformed(&format!("unexpected field '{extra}'")));
            }
        }
        TxKind::Rebalance => {
            if !object.get("limits").is_some_and(Value::is_object) {
                return Err(malformed("missing limits object"));
            }
            let round: &Map<String, Value> = object
                .get("round")
                .and_then(Value::as_object)
                .ok_or_else(|| malformed("missing round object"))?;
            if let Some(missing) = ROUND_REQUIRED.iter().find(|f| !round.contains_key(**f)) {
                return Err(malformed(&format!("round missing '{missing}'")));
            }
        }
    }

    Ok(())
}
