//! Stake events observed on Ethereum and the buffer that holds them until
//! they are final.

use shared_types::{EthAddress, StakeKind, StakeSubject, WitnessData, U256};
use std::collections::{BTreeMap, BTreeSet};

/// A staking contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeEvent {
    pub subject: StakeSubject,
    pub kind: StakeKind,
    pub amount: U256,
    pub block: u64,
    pub address: EthAddress,
    /// Hex ed25519 key for validator events.
    pub public_key: Option<String>,
}

impl StakeEvent {
    pub fn poster(kind: StakeKind, address: EthAddress, amount: U256, block: u64) -> Self {
        Self {
            subject: StakeSubject::Poster,
            kind,
            amount,
            block,
            address,
            public_key: None,
        }
    }

    pub fn validator(
        kind: StakeKind,
        address: EthAddress,
        amount: U256,
        block: u64,
        public_key: String,
    ) -> Self {
        Self {
            subject: StakeSubject::Validator,
            kind,
            amount,
            block,
            address,
            public_key: Some(public_key),
        }
    }

    /// The witness payload reporting this event.
    pub fn to_witness(&self) -> WitnessData {
        WitnessData::new(
            self.subject,
            self.kind,
            self.amount,
            self.block,
            self.address,
            self.public_key.clone(),
        )
    }

    pub fn id(&self) -> String {
        self.to_witness().id
    }
}

/// Events waiting for finality, keyed by block then id, plus the ids of
/// recently applied events so a replayed event is not applied twice.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: BTreeMap<u64, BTreeMap<String, StakeEvent>>,
    applied: BTreeMap<u64, BTreeSet<String>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer an event. Returns `false` if it is already buffered or applied.
    pub fn insert(&mut self, event: StakeEvent) -> bool {
        let id = event.id();
        if self.was_applied(event.block, &id) {
            return false;
        }
        self.pending
            .entry(event.block)
            .or_default()
            .insert(id, event)
            .is_none()
    }

    /// Remove and return every buffered event at or below `block`, ordered by
    /// block then id.
    pub fn drain_through(&mut self, block: u64) -> Vec<StakeEvent> {
        let later = self.pending.split_off(&(block.saturating_add(1)));
        let matured = std::mem::replace(&mut self.pending, later);
        if block == u64::MAX {
            // split_off above saturated; everything is mature.
            let rest = std::mem::take(&mut self.pending);
            return matured
                .into_values()
                .chain(rest.into_values())
                .flat_map(BTreeMap::into_values)
                .collect();
        }
        matured
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect()
    }

    pub fn mark_applied(&mut self, event: &StakeEvent) {
        self.applied
            .entry(event.block)
            .or_default()
            .insert(event.id());
    }

    pub fn was_applied(&self, block: u64, id: &str) -> bool {
        self.applied
            .get(&block)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Forget applied ids for blocks below `block`.
    pub fn prune_applied_below(&mut self, block: u64) {
        self.applied = self.applied.split_off(&block);
    }

    /// Buffered event count.
    pub fn len(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
