//! # Peg Reactor
//!
//! Turns provider activity into witness and rebalance transactions.
//!
//! ## Session
//!
//! 1. Subscribe, then read the chain head `h`.
//! 2. Backfill: fetch events from the first unprocessed block to `h`. Events
//!    at or below `h - finality` are applied and witnessed at once; newer
//!    ones are buffered.
//! 3. React to the stream: stake events are buffered (or applied, if their
//!    block has already matured); a new head `n` matures everything up to
//!    `n - finality` and may trigger a rebalance proposal.
//!
//! A session ends on any provider error; the reactor reconnects with
//! exponential backoff and resumes from the last matured block.

use crate::domain::config::PegConfig;
use crate::domain::errors::PegError;
use crate::domain::events::{EventBuffer, StakeEvent};
use crate::domain::mirror::BalanceMirror;
use crate::ports::outbound::{EthereumProvider, ProviderEvent};
use crate::service::broadcaster::BroadcastQueue;
use crate::service::tx_generator::TxGenerator;
use shared_types::{LimitMap, RoundParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Feeds committed round parameters back to the reactor.
#[derive(Clone)]
pub struct PegHandle {
    rounds: Arc<watch::Sender<RoundParams>>,
}

impl PegHandle {
    pub fn new(initial: RoundParams) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            rounds: Arc::new(sender),
        }
    }

    /// Report the round committed by the state machine.
    pub fn synchronize(&self, round: RoundParams) {
        self.rounds.send_if_modified(|current| {
            if *current == round {
                false
            } else {
                *current = round;
                true
            }
        });
    }

    /// Round the reactor was last told about.
    pub fn current_round(&self) -> RoundParams {
        *self.rounds.borrow()
    }
}

/// Outstanding rebalance proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Proposal {
    number: u64,
    at_block: u64,
}

pub struct Peg<P: EthereumProvider> {
    provider: Arc<P>,
    generator: TxGenerator,
    outbox: BroadcastQueue,
    config: PegConfig,
    rounds: watch::Receiver<RoundParams>,
    rounds_open: bool,
    round: RoundParams,
    mirror: BalanceMirror,
    buffer: EventBuffer,
    /// Highest block whose events have all been applied.
    matured_through: Option<u64>,
    proposal: Option<Proposal>,
}

impl<P: EthereumProvider + 'static> Peg<P> {
    pub fn new(
        provider: Arc<P>,
        generator: TxGenerator,
        outbox: BroadcastQueue,
        config: PegConfig,
        handle: &PegHandle,
    ) -> Self {
        let rounds = handle.rounds.subscribe();
        let initial_round = *rounds.borrow();
        Self {
            provider,
            generator,
            outbox,
            config,
            rounds,
            rounds_open: true,
            round: initial_round,
            mirror: BalanceMirror::new(),
            buffer: EventBuffer::new(),
            matured_through: None,
            proposal: None,
        }
    }

    pub fn mirror(&self) -> &BalanceMirror {
        &self.mirror
    }

    pub fn matured_through(&self) -> Option<u64> {
        self.matured_through
    }

    /// Run until `shutdown` flips to `true` or a fatal error occurs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), PegError> {
        let mut backoff = self.config.reconnect_base;
        info!(
            finality = self.config.finality_threshold,
            period_length = self.config.period_length,
            "[pc-06] Peg started"
        );

        loop {
            match self.session(&mut shutdown, &mut backoff).await {
                Ok(()) => {
                    info!("[pc-06] Peg stopped");
                    return Ok(());
                }
                Err(err) if err.is_fatal() => {
                    warn!(error = %err, "[pc-06] Peg stopped on fatal error");
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        retry_in_ms = backoff.as_millis() as u64,
                        "[pc-06] Provider session ended, reconnecting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = shutdown.changed() => return Ok(()),
                    }
                    backoff = next_backoff(backoff, self.config.reconnect_max);
                }
            }
        }
    }

    async fn session(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Duration,
    ) -> Result<(), PegError> {
        let mut subscription = self.provider.subscribe().await?;
        let head = self.provider.block_number().await?;
        let from = self.next_block();
        let past = if from <= head {
            self.provider.past_events(from, head).await?
        } else {
            Vec::new()
        };
        self.backfill(head, past)?;
        *backoff = self.config.reconnect_base;
        info!(head, from, "[pc-06] Connected to provider");

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                changed = self.rounds.changed(), if self.rounds_open => {
                    if changed.is_ok() {
                        let round = *self.rounds.borrow_and_update();
                        self.sync_round(round);
                    } else {
                        self.rounds_open = false;
                    }
                }
                event = subscription.recv() => match event {
                    Some(ProviderEvent::NewBlock(height)) => self.handle_block(height)?,
                    Some(ProviderEvent::Stake(event)) => self.handle_stake(event)?,
                    Some(ProviderEvent::Error(reason)) => return Err(PegError::Subscription(reason)),
                    None => return Err(PegError::SubscriptionClosed),
                },
            }
        }
    }

    fn next_block(&self) -> u64 {
        self.matured_through.map_or(0, |block| block + 1)
    }

    fn horizon(&self, head: u64) -> Option<u64> {
        head.checked_sub(self.config.finality_threshold)
    }

    /// Apply everything already final at `head`; buffer the rest.
    pub fn backfill(&mut self, head: u64, events: Vec<StakeEvent>) -> Result<(), PegError> {
        let horizon = self.horizon(head);
        let mut applied = 0usize;
        for event in events {
            if horizon.is_some_and(|h| event.block <= h) {
                if self.apply(event)? {
                    applied += 1;
                }
            } else {
                self.buffer.insert(event);
            }
        }
        debug!(head, applied, buffered = self.buffer.len(), "[pc-06] Backfill complete");

        match horizon {
            Some(h) => self.mature_through(h),
            None => Ok(()),
        }
    }

    /// A stake event from the live stream.
    pub fn handle_stake(&mut self, event: StakeEvent) -> Result<(), PegError> {
        if self.matured_through.is_some_and(|m| event.block <= m) {
            debug!(block = event.block, "[pc-06] Late event for matured block");
            self.apply(event)?;
        } else {
            self.buffer.insert(event);
        }
        Ok(())
    }

    /// A new chain head.
    pub fn handle_block(&mut self, height: u64) -> Result<(), PegError> {
        match self.horizon(height) {
            Some(maturing) => self.mature_through(maturing),
            None => Ok(()),
        }
    }

    /// Committed round changed.
    pub fn sync_round(&mut self, round: RoundParams) {
        if round.number < self.round.number {
            warn!(
                known = self.round.number,
                reported = round.number,
                "[pc-06] Ignoring older round"
            );
            return;
        }
        if round != self.round {
            info!(round = round.number, ends_at = round.ends_at, "[pc-06] Round synchronized");
        }
        self.round = round;
        if self.proposal.is_some_and(|p| p.number <= round.number) {
            self.proposal = None;
        }
    }

    fn mature_through(&mut self, maturing: u64) -> Result<(), PegError> {
        if self.matured_through.is_some_and(|m| maturing <= m) {
            return self.maybe_rebalance(maturing);
        }
        for event in self.buffer.drain_through(maturing) {
            self.apply(event)?;
        }
        self.matured_through = Some(maturing);
        self.buffer
            .prune_applied_below(maturing.saturating_sub(self.config.finality_threshold));
        self.maybe_rebalance(maturing)
    }

    /// Apply a final event to the mirror and witness it. Returns `false` for
    /// an event already applied.
    fn apply(&mut self, event: StakeEvent) -> Result<bool, PegError> {
        if self.buffer.was_applied(event.block, &event.id()) {
            return Ok(false);
        }
        let tx = self.generator.witness(&event)?;
        self.mirror.apply(&event);
        self.buffer.mark_applied(&event);
        self.outbox.push(tx)?;
        info!(
            subject = event.subject.as_str(),
            kind = event.kind.as_str(),
            amount = %event.amount,
            block = event.block,
            address = %event.address,
            "[pc-06] Witnessing stake event"
        );
        Ok(true)
    }

    fn maybe_rebalance(&mut self, maturing: u64) -> Result<(), PegError> {
        if maturing < self.round.ends_at {
            return Ok(());
        }
        let number = self.round.number + 1;
        if let Some(proposal) = self.proposal {
            let retry_at = proposal.at_block.saturating_add(self.config.period_length);
            if proposal.number == number && maturing < retry_at {
                return Ok(());
            }
        }

        let round = RoundParams {
            number,
            starts_at: maturing,
            ends_at: maturing.saturating_add(self.config.period_length),
            limit: self.config.period_limit,
        };
        let limits = if self.round.number == 0 {
            LimitMap::new()
        } else {
            self.mirror.limits(self.round.limit)
        };
        let posters = limits.len();
        let tx = self.generator.rebalance(round, limits)?;
        self.outbox.push(tx)?;
        self.proposal = Some(Proposal {
            number,
            at_block: maturing,
        });
        info!(
            round = number,
            starts_at = round.starts_at,
            ends_at = round.ends_at,
            posters,
            "[pc-06] Proposing rebalance"
        );
        Ok(())
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
