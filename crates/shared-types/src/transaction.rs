//! # Transaction Envelope and Payloads
//!
//! Wire shape: `{ "type": <tag>, "data": <payload>, "proof": <proof>? }`.
//!
//! The envelope keeps `data` as an untyped JSON value. That value is what the
//! validator signature covers (see `pc-02-signer`), and each handler parses it
//! into the matching typed payload below.

use crate::entities::{EthAddress, U256};
use crate::errors::UnknownTxType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ENVELOPE
// =============================================================================

/// Closed set of transaction types understood by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    /// Order broadcast by a staked poster.
    Order,
    /// Stream message broadcast by a staked poster.
    Stream,
    /// Validator report of an observed Ethereum stake event.
    Witness,
    /// Validator proposal of the next rate-limit round.
    Rebalance,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Order => "order",
            TxKind::Stream => "stream",
            TxKind::Witness => "witness",
            TxKind::Rebalance => "rebalance",
        }
    }

    /// Order and stream transactions carry the end user's own signature and
    /// are exempt from the validator-proof requirement.
    pub fn is_externally_signed(&self) -> bool {
        matches!(self, TxKind::Order | TxKind::Stream)
    }
}

impl FromStr for TxKind {
    type Err = UnknownTxType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(TxKind::Order),
            "stream" => Ok(TxKind::Stream),
            "witness" => Ok(TxKind::Witness),
            "rebalance" => Ok(TxKind::Rebalance),
            other => Err(UnknownTxType(other.to_string())),
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validator proof appended by the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Hex ed25519 public key (32 bytes).
    pub from: String,
    /// Hex node id derived from `from` (20 bytes).
    #[serde(rename = "fromAddr")]
    pub from_addr: String,
    /// Hex ed25519 signature over the canonical `data` bytes (64 bytes).
    pub signature: String,
}

/// A transaction as it travels over ABCI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Raw type tag; parsed with [`SignedTransaction::kind`].
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Type-specific payload.
    pub data: Value,
    /// Validator proof. Absent on externally submitted order/stream txs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl SignedTransaction {
    /// Build an envelope without a proof.
    pub fn unsigned(kind: TxKind, data: Value) -> Self {
        Self {
            tx_type: kind.as_str().to_string(),
            data,
            proof: None,
        }
    }

    pub fn kind(&self) -> Result<TxKind, UnknownTxType> {
        self.tx_type.parse()
    }
}

// =============================================================================
// WITNESS PAYLOAD
// =============================================================================

/// Whose stake an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeSubject {
    Poster,
    Validator,
}

impl StakeSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeSubject::Poster => "poster",
            StakeSubject::Validator => "validator",
        }
    }
}

/// Direction of a stake event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeKind {
    Add,
    Remove,
}

impl StakeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeKind::Add => "add",
            StakeKind::Remove => "remove",
        }
    }
}

/// Payload of a `witness` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessData {
    pub subject: StakeSubject,
    #[serde(rename = "type")]
    pub kind: StakeKind,
    #[serde(with = "crate::bigint")]
    pub amount: U256,
    /// Ethereum block the event was emitted in.
    pub block: u64,
    /// Staker's Ethereum account.
    pub address: EthAddress,
    /// Hex ed25519 key of the validator, for validator-subject events only.
    #[serde(rename = "publicKey", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Content address of the event, see [`event_id`].
    pub id: String,
}

impl WitnessData {
    /// Build a payload and stamp it with its content id.
    pub fn new(
        subject: StakeSubject,
        kind: StakeKind,
        amount: U256,
        block: u64,
        address: EthAddress,
        public_key: Option<String>,
    ) -> Self {
        let id = event_id(subject, kind, &amount, block, &address, public_key.as_deref());
        Self {
            subject,
            kind,
            amount,
            block,
            address,
            public_key,
            id,
        }
    }

    /// Recompute the content id from the payload fields.
    pub fn computed_id(&self) -> String {
        event_id(
            self.subject,
            self.kind,
            &self.amount,
            self.block,
            &self.address,
            self.public_key.as_deref(),
        )
    }
}

/// Content address of a stake event: hex of the first 16 bytes of
/// `SHA-256("{subject}:{type}:{amount}:{block}:{address}:{publicKey}")`.
pub fn event_id(
    subject: StakeSubject,
    kind: StakeKind,
    amount: &U256,
    block: u64,
    address: &EthAddress,
    public_key: Option<&str>,
) -> String {
    let preimage = format!(
        "{}:{}:{}:{}:{}:{}",
        subject.as_str(),
        kind.as_str(),
        amount,
        block,
        address.to_hex(),
        public_key.map(str::to_ascii_lowercase).unwrap_or_default()
    );
    let digest = Sha256::digest(preimage.as_bytes());
    hex::encode(&digest[..16])
}

// =============================================================================
// REBALANCE PAYLOAD
// =============================================================================

/// Parameters of a rate-limit round (staking period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundParams {
    pub number: u64,
    /// First Ethereum block of the period.
    pub starts_at: u64,
    /// Ethereum block at which the next rebalance is due.
    pub ends_at: u64,
    /// Total order quota distributed across posters for the period.
    pub limit: u64,
}

/// Per-poster quota for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterLimit {
    pub order_limit: u64,
    pub stream_limit: u64,
}

/// Poster address → quota.
pub type LimitMap = BTreeMap<EthAddress, PosterLimit>;

/// Payload of a `rebalance` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceData {
    pub round: RoundParams,
    #[serde(default)]
    pub limits: LimitMap,
}
