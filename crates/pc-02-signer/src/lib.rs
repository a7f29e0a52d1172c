//! # Transaction Signer (PC-02)
//!
//! Authenticates transactions that originate from validators (`witness`,
//! `rebalance`).
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): keypair wrapper, per-type shape checks,
//!   proof verification. Pure, no I/O.
//! - **Ports Layer** (`ports/`): the `TransactionSigner` trait other
//!   subsystems depend on.
//! - **Service Layer** (`service.rs`): `Signer`, the keypair-backed
//!   implementation.
//!
//! ## Proof Scheme
//!
//! ```text
//! message   = canonical_json(tx.data)
//! signature = ed25519_sign(secret, message)
//! fromAddr  = hex(SHA-256(pubkey)[..20])
//! proof     = { from: hex(pubkey), fromAddr, signature: hex(signature) }
//! ```
//!
//! Verification re-derives `fromAddr` from the embedded key, so a valid
//! signature cannot be re-labelled with another validator's address.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::errors::SignerError;
pub use domain::keys::ValidatorKeypair;
pub use domain::shape::validate_shape;
pub use domain::verify::{verify, verify_sender};
pub use ports::inbound::TransactionSigner;
pub use service::Signer;
