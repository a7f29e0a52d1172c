//! # Domain Entities for the State Store
//!
//! ## Type Decisions
//!
//! - `balance: U256` - stake amounts are ERC-20 token units and routinely
//!   exceed `u128` at 18 decimals; the same type is used on the wire.
//! - Quotas (`order_limit`, `stream_limit`) are `u64`. They are derived from
//!   `round.limit`, which is itself `u64`.

use super::errors::StateError;
use super::events::PendingEvents;
use serde::{Serialize, Serializer};
use shared_types::{EthAddress, Hash, NodeId, PublicKey, RoundParams, StakeKind, U256};
use std::collections::{BTreeMap, BTreeSet};

fn serialize_hex<S: Serializer, const N: usize>(
    bytes: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

// =============================================================================
// POSTERS
// =============================================================================

/// A staked account allowed to broadcast orders.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    #[serde(with = "shared_types::bigint")]
    pub balance: U256,
    /// Orders still allowed in the current round.
    pub order_limit: u64,
    /// Streams still allowed in the current round.
    pub stream_limit: u64,
}

impl Poster {
    /// A poster with `balance` and no quota until the next rebalance.
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Consensus validator bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub power: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub public_key: PublicKey,
    /// Ethereum account the validator staked from, once known.
    pub eth_account: Option<EthAddress>,
    /// Last height this validator proposed.
    pub last_proposed: u64,
    /// Last height this validator appeared in the vote list.
    pub last_voted: u64,
    pub total_votes: u64,
    pub active: bool,
    /// Part of the genesis validator set.
    pub genesis: bool,
    /// Whether the latest stake change has been reflected in voting power.
    pub applied: bool,
    /// Stake mirrored from validator-subject witness events.
    #[serde(with = "shared_types::bigint")]
    pub stake: U256,
}

impl Validator {
    /// A validator from the genesis set: active, with its stake considered
    /// applied.
    pub fn genesis(public_key: PublicKey, power: u64) -> Self {
        Self {
            power,
            public_key,
            eth_account: None,
            last_proposed: 0,
            last_voted: 0,
            total_votes: 0,
            active: true,
            genesis: true,
            applied: true,
            stake: U256::zero(),
        }
    }

    /// A validator first learned about through a stake event.
    pub fn staked(public_key: PublicKey, eth_account: EthAddress) -> Self {
        Self {
            power: 0,
            public_key,
            eth_account: Some(eth_account),
            last_proposed: 0,
            last_voted: 0,
            total_votes: 0,
            active: false,
            genesis: false,
            applied: false,
            stake: U256::zero(),
        }
    }
}

// =============================================================================
// CONSENSUS PARAMETERS
// =============================================================================

/// Network-wide parameters, set at genesis.
///
/// `confirmation_threshold` is the only field that changes afterwards; it is
/// recomputed on every `beginBlock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusParams {
    /// Ethereum confirmations required before the peg reports an event.
    pub finality_threshold: u64,
    /// Length of a rate-limit round in Ethereum blocks.
    pub period_length: u64,
    /// Total order quota per round.
    pub period_limit: u64,
    /// Largest accepted serialized order.
    pub max_order_bytes: usize,
    /// Witness votes required to apply a pending event.
    pub confirmation_threshold: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            finality_threshold: 12,
            period_length: 25,
            period_limit: 1000,
            max_order_bytes: 15_000,
            confirmation_threshold: 1,
        }
    }
}

// =============================================================================
// LAST APPLIED EVENTS
// =============================================================================

/// Highest Ethereum block whose event of each kind has been applied, plus
/// the ids already applied at exactly that block.
///
/// Several stake events can land in one Ethereum block. A later event at the
/// marked block stays acceptable; only an id already in the applied set (or
/// anything below the mark) is stale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastEvent {
    pub add: u64,
    pub remove: u64,
    pub applied_add: BTreeSet<String>,
    pub applied_remove: BTreeSet<String>,
}

impl LastEvent {
    pub fn get(&self, kind: StakeKind) -> u64 {
        match kind {
            StakeKind::Add => self.add,
            StakeKind::Remove => self.remove,
        }
    }

    /// Ids applied at the current mark for `kind`.
    pub fn applied(&self, kind: StakeKind) -> &BTreeSet<String> {
        match kind {
            StakeKind::Add => &self.applied_add,
            StakeKind::Remove => &self.applied_remove,
        }
    }

    /// Record `id` as applied at `block`. A higher block moves the mark and
    /// resets the applied set; a lower block is ignored.
    pub fn advance(&mut self, kind: StakeKind, block: u64, id: &str) {
        let (slot, applied) = match kind {
            StakeKind::Add => (&mut self.add, &mut self.applied_add),
            StakeKind::Remove => (&mut self.remove, &mut self.applied_remove),
        };
        if block > *slot {
            *slot = block;
            applied.clear();
        }
        if block == *slot {
            applied.insert(id.to_string());
        }
    }

    /// `true` if the event `(block, id)` has already been superseded.
    pub fn is_stale(&self, kind: StakeKind, block: u64, id: &str) -> bool {
        let mark = self.get(kind);
        block < mark || (block == mark && self.applied(kind).contains(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// The full replicated application state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub round: RoundParams,
    pub posters: BTreeMap<EthAddress, Poster>,
    pub events: PendingEvents,
    pub last_event: LastEvent,
    pub validators: BTreeMap<NodeId, Validator>,
    pub consensus_params: ConsensusParams,
    /// Orders accepted since genesis. Never reset.
    pub order_counter: u64,
    pub last_block_height: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub last_block_app_hash: Hash,
}

impl State {
    /// Fresh state from the genesis template.
    pub fn new(consensus_params: ConsensusParams) -> Self {
        Self {
            consensus_params,
            ..Default::default()
        }
    }

    pub fn active_validator_count(&self) -> usize {
        self.validators.values().filter(|v| v.active).count()
    }

    pub fn is_validator(&self, node_id: &NodeId) -> bool {
        self.validators.contains_key(node_id)
    }

    /// Remaining order quota for `address` (zero for unknown posters).
    pub fn order_quota(&self, address: &EthAddress) -> u64 {
        self.posters.get(address).map_or(0, |p| p.order_limit)
    }

    /// Remaining stream quota for `address` (zero for unknown posters).
    pub fn stream_quota(&self, address: &EthAddress) -> u64 {
        self.posters.get(address).map_or(0, |p| p.stream_limit)
    }

    /// Take one unit of order quota from `address`.
    pub fn consume_order_quota(&mut self, address: &EthAddress) -> Result<u64, StateError> {
        let poster = self
            .posters
            .get_mut(address)
            .ok_or(StateError::PosterNotFound(*address))?;
        if poster.order_limit == 0 {
            return Err(StateError::QuotaExhausted(*address));
        }
        poster.order_limit -= 1;
        self.order_counter += 1;
        Ok(poster.order_limit)
    }

    /// Take one unit of stream quota from `address`.
    pub fn consume_stream_quota(&mut self, address: &EthAddress) -> Result<u64, StateError> {
        let poster = self
            .posters
            .get_mut(address)
            .ok_or(StateError::PosterNotFound(*address))?;
        if poster.stream_limit == 0 {
            return Err(StateError::QuotaExhausted(*address));
        }
        poster.stream_limit -= 1;
        Ok(poster.stream_limit)
    }

    /// Apply a confirmed stake change to a poster balance.
    ///
    /// `add` creates the poster on first sight. `remove` saturates at zero.
    /// A poster whose balance reaches zero is dropped. Returns the new
    /// balance.
    pub fn apply_poster_stake(&mut self, kind: StakeKind, address: EthAddress, amount: U256) -> U256 {
        let entry = self.posters.entry(address).or_default();
        entry.balance = match kind {
            StakeKind::Add => entry.balance.saturating_add(amount),
            StakeKind::Remove => entry.balance.saturating_sub(amount),
        };
        let balance = entry.balance;
        if balance.is_zero() {
            self.posters.remove(&address);
        }
        balance
    }

    /// Apply a confirmed stake change to a validator record, creating an
    /// inactive non-genesis record on first sight.
    pub fn apply_validator_stake(
        &mut self,
        kind: StakeKind,
        public_key: PublicKey,
        eth_account: EthAddress,
        amount: U256,
    ) -> U256 {
        let node_id = NodeId::from_public_key(&public_key);
        let validator = self
            .validators
            .entry(node_id)
            .or_insert_with(|| Validator::staked(public_key, eth_account));
        validator.stake = match kind {
            StakeKind::Add => validator.stake.saturating_add(amount),
            StakeKind::Remove => validator.stake.saturating_sub(amount),
        };
        validator.eth_account = Some(eth_account);
        validator.applied = false;
        validator.stake
    }

    /// Overwrite round parameters and, when given, every poster's quota.
    ///
    /// Posters missing from `limits` keep their balance but get no quota.
    pub fn apply_round(&mut self, round: RoundParams, limits: Option<&shared_types::LimitMap>) {
        self.round = round;
        if let Some(limits) = limits {
            for (address, poster) in self.posters.iter_mut() {
                let limit = limits.get(address).copied().unwrap_or_default();
                poster.order_limit = limit.order_limit;
                poster.stream_limit = limit.stream_limit;
            }
        }
    }
}
