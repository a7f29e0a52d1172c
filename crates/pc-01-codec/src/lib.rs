//! # Transaction Codec (PC-01)
//!
//! Converts transactions to and from the ABCI wire form:
//!
//! ```text
//! SignedTransaction ──serde_json──→ JSON ──zlib──→ bytes ──base64──→ wire
//! ```
//!
//! Big integers inside payloads are rendered as `"<digits>n"` by
//! `shared_types::bigint`, so the JSON step is lossless for 256-bit amounts.
//!
//! Every failure on the decode path surfaces as a [`CodecError`], which the
//! state machine turns into a `decompress` rejection without touching state.

pub mod errors;
pub mod wire;

pub use errors::CodecError;
pub use wire::{decode, decode_str, encode, MAX_DECODED_BYTES};
