use shared_types::{EthAddress, NodeId};
use thiserror::Error;

/// Errors raised by direct state mutations.
///
/// Handlers translate these into rejected transactions; none of them can
/// escape the ABCI surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("Poster not found: {0}")]
    PosterNotFound(EthAddress),

    #[error("Validator not found: {0}")]
    ValidatorNotFound(NodeId),

    #[error("Quota exhausted for {0}")]
    QuotaExhausted(EthAddress),

    #[error("Pending event not found: block {block}, id {id}")]
    EventNotFound { block: u64, id: String },
}
