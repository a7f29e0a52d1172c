//! # Pending Event Index
//!
//! Witnessed stake events awaiting the confirmation threshold, keyed by
//! `(ethereum block, event id)`.
//!
//! Deletion is explicit: [`PendingEvents::remove`] drops a confirmed event
//! and prunes its block once empty, so no empty block buckets ever remain
//! in the index (and therefore none reach the state hash).
//!
//! Each entry records which validators reported it. `conf` always equals the
//! number of distinct voters, so one validator cannot confirm an event alone
//! by resubmitting its report.

use super::errors::StateError;
use serde::Serialize;
use shared_types::{EthAddress, NodeId, StakeKind, StakeSubject, U256};
use std::collections::{BTreeMap, BTreeSet};

/// A stake event that has been reported but not yet applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEvent {
    pub subject: StakeSubject,
    #[serde(rename = "type")]
    pub kind: StakeKind,
    pub address: EthAddress,
    #[serde(with = "shared_types::bigint")]
    pub amount: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Distinct validators that reported this event.
    pub conf: u64,
    pub voters: BTreeSet<NodeId>,
}

impl PendingEvent {
    /// Entry for a first report by `voter`.
    pub fn reported(
        subject: StakeSubject,
        kind: StakeKind,
        address: EthAddress,
        amount: U256,
        public_key: Option<String>,
        voter: NodeId,
    ) -> Self {
        Self {
            subject,
            kind,
            address,
            amount,
            public_key,
            conf: 1,
            voters: BTreeSet::from([voter]),
        }
    }

    /// `true` if `voter` has already reported this event.
    pub fn has_voted(&self, voter: &NodeId) -> bool {
        self.voters.contains(voter)
    }

    /// Count a report from `voter`. Returns `false` for a repeat voter.
    pub fn vote(&mut self, voter: NodeId) -> bool {
        if !self.voters.insert(voter) {
            return false;
        }
        self.conf = self.voters.len() as u64;
        true
    }

    /// `true` if a new report agrees with this entry on what happened.
    pub fn matches(&self, kind: StakeKind, amount: &U256) -> bool {
        self.kind == kind && &self.amount == amount
    }
}

/// Ordered index of pending events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PendingEvents {
    by_block: BTreeMap<u64, BTreeMap<String, PendingEvent>>,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, block: u64, id: &str) -> Option<&PendingEvent> {
        self.by_block.get(&block).and_then(|events| events.get(id))
    }

    pub fn get_mut(&mut self, block: u64, id: &str) -> Option<&mut PendingEvent> {
        self.by_block
            .get_mut(&block)
            .and_then(|events| events.get_mut(id))
    }

    /// Insert (or replace) the entry for `(block, id)`.
    pub fn insert(&mut self, block: u64, id: String, event: PendingEvent) {
        self.by_block.entry(block).or_default().insert(id, event);
    }

    /// Remove the entry for `(block, id)`, pruning the block if it is left
    /// empty.
    pub fn remove(&mut self, block: u64, id: &str) -> Result<PendingEvent, StateError> {
        let not_found = || StateError::EventNotFound {
            block,
            id: id.to_string(),
        };
        let events = self.by_block.get_mut(&block).ok_or_else(not_found)?;
        let event = events.remove(id).ok_or_else(not_found)?;
        if events.is_empty() {
            self.by_block.remove(&block);
        }
        Ok(event)
    }

    pub fn contains_block(&self, block: u64) -> bool {
        self.by_block.contains_key(&block)
    }

    /// Number of pending events across all blocks.
    pub fn len(&self) -> usize {
        self.by_block.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_block.is_empty()
    }

    /// Iterate `(block, id, event)` in block order, then id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str, &PendingEvent)> {
        self.by_block.iter().flat_map(|(block, events)| {
            events
                .iter()
                .map(move |(id, event)| (*block, id.as_str(), event))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(amount: u64) -> PendingEvent {
        PendingEvent::reported(
            StakeSubject::Poster,
            StakeKind::Add,
            EthAddress([1; 20]),
            U256::from(amount),
            None,
            NodeId([1; 20]),
        )
    }

    #[test]
    fn test_insert_get_remove_prunes_block() {
        let mut events = PendingEvents::new();
        events.insert(10, "a".into(), pending(5));
        events.insert(10, "b".into(), pending(6));

        assert_eq!(events.len(), 2);
        assert_eq!(events.get(10, "a").unwrap().amount, U256::from(5u64));

        events.remove(10, "a").unwrap();
        assert!(events.contains_block(10));

        events.remove(10, "b").unwrap();
        assert!(!events.contains_block(10));
        assert!(events.is_empty());
    }

    #[test]
    fn test_remove_missing() {
        let mut events = PendingEvents::new();
        assert_eq!(
            events.remove(3, "x"),
            Err(StateError::EventNotFound {
                block: 3,
                id: "x".into()
            })
        );
    }

    #[test]
    fn test_repeat_voter_not_counted() {
        let mut event = pending(5);
        assert!(event.has_voted(&NodeId([1; 20])));

        assert!(!event.vote(NodeId([1; 20])));
        assert_eq!(event.conf, 1);

        assert!(event.vote(NodeId([2; 20])));
        assert!(!event.vote(NodeId([2; 20])));
        assert_eq!(event.conf, 2);
        assert_eq!(event.voters.len(), 2);
    }

    #[test]
    fn test_iteration_order() {
        let mut events = PendingEvents::new();
        events.insert(9, "z".into(), pending(1));
        events.insert(3, "b".into(), pending(1));
        events.insert(3, "a".into(), pending(1));

        let order: Vec<_> = events.iter().map(|(b, id, _)| (b, id.to_string())).collect();
        assert_eq!(
            order,
            vec![(3, "a".to_string()), (3, "b".to_string()), (9, "z".to_string())]
        );
    }

    #[test]
    fn test_matches() {
        let event = pending(5);
        assert!(event.matches(StakeKind::Add, &U256::from(5u64)));
        assert!(!event.matches(StakeKind::Remove, &U256::from(5u64)));
        assert!(!event.matches(StakeKind::Add, &U256::from(6u64)));
    }
}
