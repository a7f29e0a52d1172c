//! # Transaction Handlers (PC-04)
//!
//! Validation and execution of the four transaction types against a
//! [`State`](pc_03_state_store::State).
//!
//! ## Contract
//!
//! Every transaction type has a pair of functions:
//!
//! | Function | State | Mutates |
//! |----------|-------|---------|
//! | `check_*` | committed (`&State`) | never |
//! | `deliver_*` | speculative (`&mut State`) | only on success |
//!
//! Both return `Result<TxOutcome, TxError>`. A rejected delivery leaves the
//! state exactly as it found it.
//!
//! ## Modules
//!
//! - `domain/`: order object and poster recovery, `gen_limits`, error taxonomy
//! - `handlers/`: the per-type check/deliver functions
//! - `ports/`: the `OrderTracker` outbound port
//! - `adapters/`: `QueuedOrderTracker`, a broadcast-channel implementation

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod ports;

pub use adapters::queued_tracker::{OrderBatch, QueuedOrderTracker};
pub use domain::errors::{OrderError, TxError, TxOutcome};
pub use domain::limits::{gen_limits, limits_for_state};
pub use domain::order::{address_from_pubkey, sign_order, Order, PosterSignature};
pub use handlers::order::{check_order, check_stream, deliver_order, deliver_stream};
pub use handlers::rebalance::{check_rebalance, deliver_rebalance};
pub use handlers::witness::{check_witness, deliver_witness};
pub use ports::outbound::{OrderTracker, TrackedOrder};
