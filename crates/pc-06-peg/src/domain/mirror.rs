//! Local view of poster balances, rebuilt from the same events the peg
//! witnesses. Rebalance limits are computed from it, so it must follow the
//! same rules as the ledger: removals saturate at zero and an emptied poster
//! disappears.

use crate::domain::events::StakeEvent;
use pc_04_handlers::gen_limits;
use shared_types::{EthAddress, LimitMap, StakeKind, StakeSubject, U256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceMirror {
    balances: BTreeMap<EthAddress, U256>,
}

impl BalanceMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poster stake event. Validator events are ignored.
    pub fn apply(&mut self, event: &StakeEvent) {
        if event.subject != StakeSubject::Poster {
            return;
        }
        let current = self.balance(&event.address);
        let updated = match event.kind {
            StakeKind::Add => current.saturating_add(event.amount),
            StakeKind::Remove => current.saturating_sub(event.amount),
        };
        if updated.is_zero() {
            self.balances.remove(&event.address);
        } else {
            self.balances.insert(event.address, updated);
        }
    }

    pub fn balance(&self, address: &EthAddress) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    /// Quotas for a round distributing `limit` orders.
    pub fn limits(&self, limit: u64) -> LimitMap {
        gen_limits(self.balances.iter().map(|(a, b)| (*a, *b)), limit)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
