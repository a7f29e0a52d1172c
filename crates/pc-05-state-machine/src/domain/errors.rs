use thiserror::Error;

/// Reasons a commit is refused. Never surfaced through ABCI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("Round drift: committed round {committed}, delivered round {delivered}")]
    RoundDrift { committed: u64, delivered: u64 },

    #[error("Round regressed: committed round {committed}, delivered round {delivered}")]
    RoundRegressed { committed: u64, delivered: u64 },
}
