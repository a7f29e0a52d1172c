//! # ABCI Request and Response Types
//!
//! The subset of the ABCI surface this application implements, independent
//! of any particular transport binding.

use pc_04_handlers::{TxError, TxOutcome};
use shared_types::{Hash, NodeId, PublicKey};

/// Response code for an accepted transaction or query.
pub const CODE_OK: u32 = 0;
/// Response code for a rejected transaction or failed query.
pub const CODE_REJECTED: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoResponse {
    pub data: String,
    pub version: String,
    pub last_block_height: u64,
    pub last_block_app_hash: Hash,
}

/// A validator key and its voting power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub pub_key: PublicKey,
    pub power: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitChainRequest {
    pub validators: Vec<ValidatorUpdate>,
}

/// One entry of the previous block's commit info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteInfo {
    pub validator: NodeId,
    pub power: u64,
    pub signed_last_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginBlockRequest {
    pub height: u64,
    pub proposer_address: NodeId,
    pub votes: Vec<VoteInfo>,
}

/// Result of `checkTx` / `deliverTx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub code: u32,
    pub log: String,
}

impl TxResponse {
    pub fn accepted(outcome: &TxOutcome) -> Self {
        Self {
            code: CODE_OK,
            log: outcome.to_string(),
        }
    }

    pub fn rejected(err: &TxError) -> Self {
        Self {
            code: CODE_REJECTED,
            log: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// The error tag of a rejected response (`"noStake"`, `"badSig"`, ...).
    pub fn tag(&self) -> Option<&str> {
        if self.is_ok() {
            return None;
        }
        self.log.split(':').next()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndBlockResponse {
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResponse {
    pub data: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub code: u32,
    /// JSON bytes.
    pub value: Vec<u8>,
    pub log: String,
    pub height: u64,
}
