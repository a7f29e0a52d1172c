//! Feeds committed rounds from the state machine to the peg.

use pc_05_state_machine::RoundSync;
use pc_06_peg::PegHandle;
use shared_types::RoundParams;
use tracing::debug;

pub struct PegRoundSync {
    handle: PegHandle,
}

impl PegRoundSync {
    pub fn new(handle: PegHandle) -> Self {
        Self { handle }
    }
}

impl RoundSync for PegRoundSync {
    fn synchronize(&self, round: RoundParams) {
        debug!(round = round.number, ends_at = round.ends_at, "[node] Syncing round to peg");
        self.handle.synchronize(round);
    }
}
