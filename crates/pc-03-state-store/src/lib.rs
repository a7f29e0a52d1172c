//! # State Store (PC-03)
//!
//! The in-memory replicated state of the application.
//!
//! ## Role in System
//!
//! Two instances exist at runtime, both owned by the state machine:
//!
//! ```text
//!   checkTx ──reads──→ [commit state]  ←──deep copy── commit
//!                                                      ↑
//!   beginBlock/deliverTx ──mutates──→ [deliver state] ─┘
//! ```
//!
//! Handlers receive a `&State` (admission) or `&mut State` (execution); there
//! is no ambient global.
//!
//! ## Determinism
//!
//! Every collection is a `BTreeMap`, so iteration order (and therefore the
//! state hash and any derived rate limits) is identical on every replica.

pub mod domain;

pub use domain::entities::*;
pub use domain::errors::StateError;
pub use domain::events::{PendingEvent, PendingEvents};
pub use domain::hasher::{compute_state_hash, hash_projection};
