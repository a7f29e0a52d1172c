//! Dev Ethereum chain: a timer mining blocks on a [`ChannelProvider`].

use pc_06_peg::{ChannelProvider, StakeEvent};
use shared_types::{EthAddress, StakeKind, U256};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub struct EthMiner {
    provider: ChannelProvider,
    interval: Duration,
}

impl EthMiner {
    pub fn new(provider: ChannelProvider, interval: Duration) -> Self {
        Self { provider, interval }
    }

    /// Mine a block carrying the given poster stakes. Returns its height.
    pub fn stake_posters(&self, stakes: &[(EthAddress, U256)]) -> u64 {
        let block = self.provider.mine_block();
        for (address, amount) in stakes {
            info!(%address, %amount, block, "[node] Dev stake");
            self.provider
                .emit(StakeEvent::poster(StakeKind::Add, *address, *amount, block));
        }
        block
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.provider.mine_block();
                }
                _ = shutdown.changed() => break,
            }
        }
        info!(height = self.provider.height(), "[node] Dev Ethereum miner stopped");
    }
}
