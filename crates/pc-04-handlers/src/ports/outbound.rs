//! # Outbound Ports (Driven Ports / SPI)
//!
//! Dependencies the handlers need the host to provide.

use serde::Serialize;
use serde_json::Value;
use shared_types::{EthAddress, TxKind};

/// An accepted order or stream, with its id attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedOrder {
    pub id: String,
    /// `Order` or `Stream`.
    #[serde(serialize_with = "serialize_kind")]
    pub kind: TxKind,
    pub poster: EthAddress,
    /// The payload as submitted.
    pub order: Value,
}

fn serialize_kind<S: serde::Serializer>(kind: &TxKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.as_str())
}

/// Collects orders accepted during a block and hands them off at commit.
///
/// `add` is called from `deliverTx`; `flush` once per block from `commit`.
/// Implementations must not fail: a lost hand-off must never affect
/// consensus.
pub trait OrderTracker: Send + Sync {
    /// Queue an accepted order.
    fn add(&self, order: TrackedOrder);

    /// Publish everything queued since the last flush. Returns the batch size.
    fn flush(&self) -> usize;

    /// Drop everything queued since the last flush without publishing it.
    /// Used when a block's effects are discarded.
    fn discard(&self) -> usize;

    /// Orders queued and not yet flushed.
    fn pending(&self) -> usize;
}
