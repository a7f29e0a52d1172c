//! # Codec Errors

use thiserror::Error;

/// Failure at one of the wire encoding steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The wire bytes are not valid base64.
    #[error("Invalid base64: {0}")]
    Base64(String),

    /// The payload could not be inflated.
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// Inflated payload exceeds the decode limit.
    #[error("Decoded payload exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Inflated payload is not a transaction envelope.
    #[error("Invalid transaction JSON: {0}")]
    Json(String),

    /// Encoding side failure.
    #[error("Encoding failed: {0}")]
    Encode(String),
}
