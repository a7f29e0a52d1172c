//! # Inbound Ports (Driving Ports / API)
//!
//! The signing API other subsystems depend on.

use crate::domain::errors::SignerError;
use serde_json::Value;
use shared_types::{NodeId, SignedTransaction, TxKind};

/// Produces signed validator transactions.
///
/// Implementations must be thread-safe (`Send + Sync`); the peg signs from a
/// background task.
pub trait TransactionSigner: Send + Sync {
    /// Validate `data` for `kind`, sign it and attach the proof.
    fn create(&self, kind: TxKind, data: Value) -> Result<SignedTransaction, SignerError>;

    /// Node id of the signing key.
    fn node_id(&self) -> NodeId;
}
