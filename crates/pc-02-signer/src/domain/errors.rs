//! # Signer Errors

use shared_types::TxKind;
use thiserror::Error;

/// Errors raised while creating or checking a validator proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The payload does not have the shape its type requires.
    #[error("Malformed {kind} transaction: {reason}")]
    MalformedTransaction { kind: TxKind, reason: String },

    /// The transaction carries no proof.
    #[error("Missing proof")]
    MissingProof,

    /// A proof field is not valid hex of the right length.
    #[error("Malformed proof field '{field}'")]
    MalformedProof { field: &'static str },

    /// The public key is not a valid ed25519 point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// `fromAddr` does not match the address derived from `from`.
    #[error("Proof address does not match public key")]
    AddressMismatch,

    /// The signature does not verify over the payload.
    #[error("Signature verification failed")]
    VerificationFailed,
}
