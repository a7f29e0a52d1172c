//! # Channel Provider
//!
//! In-process [`EthereumProvider`]: the chain is a block counter plus an event
//! log, and subscribers are fed over channels. Used by the development chain
//! and by tests to script Ethereum activity.

use crate::domain::errors::PegError;
use crate::domain::events::StakeEvent;
use crate::ports::outbound::{EthereumProvider, ProviderEvent, Subscription};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const SUBSCRIPTION_CAPACITY: usize = 1024;

#[derive(Default)]
struct ChainLog {
    height: u64,
    events: Vec<StakeEvent>,
    subscribers: Vec<mpsc::Sender<ProviderEvent>>,
}

/// Scriptable provider. Clones share the same chain.
#[derive(Clone, Default)]
pub struct ChannelProvider {
    chain: Arc<Mutex<ChainLog>>,
    offline: Arc<AtomicBool>,
}

impl ChannelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at `height` instead of 0.
    pub fn at_height(height: u64) -> Self {
        let provider = Self::default();
        provider.chain.lock().height = height;
        provider
    }

    pub fn height(&self) -> u64 {
        self.chain.lock().height
    }

    pub fn subscriber_count(&self) -> usize {
        self.chain.lock().subscribers.len()
    }

    /// Advance the head by one block and notify subscribers.
    pub fn mine_block(&self) -> u64 {
        let mut chain = self.chain.lock();
        chain.height += 1;
        let height = chain.height;
        Self::publish(&mut chain, ProviderEvent::NewBlock(height));
        height
    }

    /// Mine blocks until the head reaches `height`.
    pub fn mine_to(&self, height: u64) {
        while self.height() < height {
            self.mine_block();
        }
    }

    /// Emit a staking event. Its `block` is taken as given, so events can be
    /// placed in the past.
    pub fn emit(&self, event: StakeEvent) {
        let mut chain = self.chain.lock();
        chain.events.push(event.clone());
        Self::publish(&mut chain, ProviderEvent::Stake(event));
    }

    /// Record an event without notifying subscribers; it is only visible
    /// through `past_events`.
    pub fn record(&self, event: StakeEvent) {
        self.chain.lock().events.push(event);
    }

    /// Fail every open subscription.
    pub fn fail_subscriptions(&self, reason: &str) {
        let mut chain = self.chain.lock();
        for subscriber in chain.subscribers.drain(..) {
            let _ = subscriber.try_send(ProviderEvent::Error(reason.to_string()));
        }
    }

    /// While offline every request fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), PegError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PegError::Provider("provider offline".into()));
        }
        Ok(())
    }

    fn publish(chain: &mut ChainLog, event: ProviderEvent) {
        chain.subscribers.retain(|subscriber| match subscriber.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("[pc-06] Subscriber lagging, event dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

#[async_trait]
impl EthereumProvider for ChannelProvider {
    async fn subscribe(&self) -> Result<Subscription, PegError> {
        self.ensure_online()?;
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let mut chain = self.chain.lock();
        chain.subscribers.push(sender);
        debug!(subscribers = chain.subscribers.len(), "[pc-06] Subscription opened");
        Ok(receiver)
    }

    async fn past_events(&self, from: u64, to: u64) -> Result<Vec<StakeEvent>, PegError> {
        self.ensure_online()?;
        Ok(self
            .chain
            .lock()
            .events
            .iter()
            .filter(|event| (from..=to).contains(&event.block))
            .cloned()
            .collect())
    }

    async fn block_number(&self) -> Result<u64, PegError> {
        self.ensure_online()?;
        Ok(self.chain.lock().height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{EthAddress, StakeKind};

    #[tokio::test]
    async fn test_subscription_sees_blocks_and_events() {
        let provider = ChannelProvider::new();
        let mut subscription = provider.subscribe().await.unwrap();

        provider.mine_block();
        let event = StakeEvent::poster(StakeKind::Add, EthAddress([1; 20]), 5u64.into(), 1);
        provider.emit(event.clone());

        assert_eq!(subscription.recv().await, Some(ProviderEvent::NewBlock(1)));
        assert_eq!(subscription.recv().await, Some(ProviderEvent::Stake(event)));
    }

    #[tokio::test]
    async fn test_past_events_range_is_inclusive() {
        let provider = ChannelProvider::at_height(20);
        for block in [3, 5, 9] {
            provider.record(StakeEvent::poster(
                StakeKind::Add,
                EthAddress([1; 20]),
                1u64.into(),
                block,
            ));
        }
        let events = provider.past_events(5, 9).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(provider.block_number().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_offline_and_failed_subscriptions() {
        let provider = ChannelProvider::new();
        let mut subscription = provider.subscribe().await.unwrap();
        provider.fail_subscriptions("socket hang up");
        assert_eq!(
            subscription.recv().await,
            Some(ProviderEvent::Error("socket hang up".into()))
        );
        assert_eq!(subscription.recv().await, None);

        provider.set_offline(true);
        assert!(provider.subscribe().await.is_err());
    }
}
