//! # Proof Verification
//!
//! Verification never mutates anything and never panics; malformed input is
//! reported as an error (or `false` through [`verify`]).

use super::errors::SignerError;
use ed25519_dalek::{Signature, VerifyingKey};
use shared_types::{canonical_bytes, NodeId, SignedTransaction};

fn decode_hex<const N: usize>(input: &str, field: &'static str) -> Result<[u8; N], SignerError> {
    let bytes = hex::decode(input).map_err(|_| SignerError::MalformedProof { field })?;
    bytes
        .try_into()
        .map_err(|_| SignerError::MalformedProof { field })
}

/// Verify the proof on `tx` and return the node id that produced it.
///
/// Both checks must pass:
/// 1. `proof.fromAddr` equals the node id derived from `proof.from`
/// 2. `proof.signature` is a valid ed25519 signature by `proof.from` over
///    the canonical bytes of `tx.data`
pub fn verify_sender(tx: &SignedTransaction) -> Result<NodeId, SignerError> {
    let proof = tx.proof.as_ref().ok_or(SignerError::MissingProof)?;

    let public_key: [u8; 32] = decode_hex(&proof.from, "from")?;
    let claimed = NodeId(decode_hex::<20>(&proof.from_addr, "fromAddr")?);
    let signature: [u8; 64] = decode_hex(&proof.signature, "signature")?;

    if NodeId::from_public_key(&public_key) != claimed {
        return Err(SignerError::AddressMismatch);
    }

    let verifying_key =
        VerifyingKey::from_bytes(&public_key).map_err(|_| SignerError::InvalidPublicKey)?;
    let signature = Signature::from_bytes(&signature);

    verifying_key
        .verify_strict(&canonical_bytes(&tx.data), &signature)
        .map_err(|_| SignerError::VerificationFailed)?;

    Ok(claimed)
}

/// `true` iff the transaction carries a valid validator proof.
pub fn verify(tx: &SignedTransaction) -> bool {
    verify_sender(tx).is_ok()
}
