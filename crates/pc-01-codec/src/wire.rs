//! # Wire Encoding
//!
//! `encode` and `decode` are exact inverses for every well-formed
//! transaction. The JSON step serializes `data` from a `serde_json::Value`
//! whose object keys are kept sorted, so two nodes encoding the same logical
//! transaction produce the same bytes.

use crate::errors::CodecError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use shared_types::SignedTransaction;
use std::io::{Read, Write};

/// Upper bound on the inflated JSON size accepted by `decode`.
pub const MAX_DECODED_BYTES: usize = 1 << 20;

/// Serialize, deflate and base64-encode a transaction.
pub fn encode(tx: &SignedTransaction) -> Result<String, CodecError> {
    let json = serde_json::to_vec(tx).map_err(|e| CodecError::Encode(e.to_string()))?;

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CodecError::Encode(e.to_string()))?;

    Ok(STANDARD.encode(compressed))
}

/// Reverse of [`encode`] for raw ABCI `tx` bytes.
pub fn decode(wire: &[u8]) -> Result<SignedTransaction, CodecError> {
    let trimmed = wire.trim_ascii();
    let compressed = STANDARD
        .decode(trimmed)
        .map_err(|e| CodecError::Base64(e.to_string()))?;

    let mut json = Vec::new();
    let mut decoder = ZlibDecoder::new(compressed.as_slice()).take(MAX_DECODED_BYTES as u64 + 1);
    decoder
        .read_to_end(&mut json)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;
    if json.len() > MAX_DECODED_BYTES {
        return Err(CodecError::TooLarge {
            limit: MAX_DECODED_BYTES,
        });
    }

    serde_json::from_slice(&json).map_err(|e| CodecError::Json(e.to_string()))
}

/// Convenience for callers holding the wire string.
pub fn decode_str(wire: &str) -> Result<SignedTransaction, CodecError> {
    decode(wire.as_bytes())
}
