//! # Shared Types Crate
//!
//! Domain entities and the transaction envelope used by every Poster-Chain
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: wire-visible types (addresses, big integers,
//!   transaction payloads) are defined once, here.
//! - **Canonical JSON**: every map that reaches the wire or a signature is a
//!   `BTreeMap`, so serialization order never depends on insertion order.
//! - **Raw envelope, typed payloads**: `SignedTransaction` keeps `data` as a
//!   JSON value; handlers parse it into a typed payload and report a `format`
//!   error when that fails.

pub mod bigint;
pub mod canonical;
pub mod entities;
pub mod errors;
pub mod transaction;

pub use canonical::{canonical_bytes, canonicalize};
pub use entities::*;
pub use errors::*;
pub use transaction::*;
