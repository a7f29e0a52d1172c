//! # Node Runtime
//!
//! Builds every component from a [`NodeConfig`] and runs them as tasks.
//!
//! ```text
//! EthMiner ──blocks──→ ChannelProvider ──→ Peg ──→ Broadcaster ──→ MempoolClient ──checkTx──┐
//!                                           ↑                                               ↓
//!                              PegRoundSync (commit)          BlockDriver ←── Mempool ←─────┘
//!                                           ↑                     │
//!                                           └──── StateMachine ←──┘ beginBlock/deliverTx/endBlock/commit
//! ```
//!
//! With `PC_ETH_WS_URL` set, the peg watches that node through an
//! [`AlloyProvider`] instead and no dev Ethereum chain is mined.

use crate::adapters::{MempoolClient, PegRoundSync};
use crate::container::{ConfigError, NodeConfig, SharedStateMachine};
use crate::dev_chain::{BlockDriver, EthMiner, Mempool};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use pc_02_signer::{Signer, TransactionSigner, ValidatorKeypair};
use pc_04_handlers::QueuedOrderTracker;
use pc_05_state_machine::{InitChainRequest, StateMachine, StateMachineConfig, ValidatorUpdate};
use pc_06_peg::{
    AlloyProvider, BroadcastError, BroadcastQueue, Broadcaster, BroadcasterStats, ChannelProvider,
    EthereumProvider, Peg, PegError, PegHandle, TxGenerator,
};
use poster_telemetry::log_event;
use shared_types::{NodeId, RoundParams};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Handles of the spawned tasks.
pub struct RuntimeTasks {
    pub broadcaster: JoinHandle<Result<BroadcasterStats, BroadcastError>>,
    pub peg: JoinHandle<Result<(), PegError>>,
    pub driver: JoinHandle<()>,
    /// Only present on the dev Ethereum chain.
    pub eth_miner: Option<JoinHandle<()>>,
    pub order_feed: JoinHandle<()>,
}

pub struct NodeRuntime {
    config: NodeConfig,
    node_id: NodeId,
    signer: Arc<Signer>,
    machine: SharedStateMachine,
    tracker: Arc<QueuedOrderTracker>,
    mempool: Arc<Mempool>,
    provider: ChannelProvider,
    peg_handle: PegHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeRuntime {
    /// Build the state machine and run `initChain` with the local validator
    /// as the only genesis validator.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let seed = config
            .validator_key
            .seed
            .ok_or(ConfigError::Missing("PC_VALIDATOR_SEED"))
            .context("validator key")?;
        let keypair = ValidatorKeypair::from_seed(seed);
        let public_key = keypair.public_key();
        let signer = Arc::new(Signer::new(keypair));
        let node_id = signer.node_id();

        let tracker = Arc::new(QueuedOrderTracker::new());
        let peg_handle = PegHandle::new(RoundParams::default());
        let mut machine = StateMachine::new(
            StateMachineConfig {
                round_drift_policy: config.abci.round_drift_policy,
                ..StateMachineConfig::default()
            },
            config.consensus_params(),
            Arc::clone(&tracker),
            PegRoundSync::new(peg_handle.clone()),
        );
        machine.init_chain(InitChainRequest {
            validators: vec![ValidatorUpdate {
                pub_key: public_key,
                power: config.validator_key.power,
            }],
        });
        info!(%node_id, power = config.validator_key.power, "[node] Genesis validator loaded");

        let mempool = Arc::new(Mempool::new(config.dev_chain.mempool_capacity));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            node_id,
            signer,
            machine: Arc::new(Mutex::new(machine)),
            tracker,
            mempool,
            provider: ChannelProvider::new(),
            peg_handle,
            shutdown_tx,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn machine(&self) -> SharedStateMachine {
        Arc::clone(&self.machine)
    }

    pub fn tracker(&self) -> Arc<QueuedOrderTracker> {
        Arc::clone(&self.tracker)
    }

    /// The dev Ethereum chain.
    pub fn provider(&self) -> ChannelProvider {
        self.provider.clone()
    }

    /// Round feed shared by the state machine and the peg.
    pub fn peg_handle(&self) -> PegHandle {
        self.peg_handle.clone()
    }

    /// Admission path for externally submitted transactions.
    pub fn client(&self) -> MempoolClient {
        MempoolClient::new(self.machine(), Arc::clone(&self.mempool))
    }

    /// A block driver over this node's state machine and mempool.
    pub fn block_driver(&self) -> BlockDriver {
        BlockDriver::new(
            self.machine(),
            Arc::clone(&self.mempool),
            self.node_id,
            self.config.validator_key.power,
            self.config.dev_chain.max_block_txs,
            self.config.dev_chain.block_interval,
        )
    }

    /// Spawn the broadcaster, peg, block driver, the order feed and, without
    /// an external Ethereum node, the dev Ethereum miner.
    pub fn start(&self) -> RuntimeTasks {
        info!("===========================================");
        info!("  Poster-Chain Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let (broadcaster, queue) = Broadcaster::new(Arc::new(self.client()));
        let (peg, eth_miner) = match self.config.ethereum.endpoint() {
            Some((url, contract)) => {
                info!(url, %contract, "[node] Watching external Ethereum node");
                let peg = self.spawn_peg(Arc::new(AlloyProvider::new(url, contract)), queue);
                (peg, None)
            }
            None => {
                let miner =
                    EthMiner::new(self.provider.clone(), self.config.dev_chain.eth_block_interval);
                if !self.config.dev_chain.stakes.is_empty() {
                    miner.stake_posters(&self.config.dev_chain.stakes);
                }
                let peg = self.spawn_peg(Arc::new(self.provider.clone()), queue);
                (peg, Some(tokio::spawn(miner.run(self.shutdown_tx.subscribe()))))
            }
        };

        let tasks = RuntimeTasks {
            broadcaster: tokio::spawn(broadcaster.run()),
            peg,
            driver: tokio::spawn(self.block_driver().run(self.shutdown_tx.subscribe())),
            eth_miner,
            order_feed: tokio::spawn(order_feed(
                Arc::clone(&self.tracker),
                self.shutdown_tx.subscribe(),
            )),
        };

        log_event!(
            info,
            "node",
            "All tasks started",
            finality = self.config.consensus.finality_threshold,
            period_length = self.config.consensus.period_length,
            block_interval_ms = self.config.dev_chain.block_interval.as_millis() as u64
        );
        tasks
    }

    fn spawn_peg<P>(&self, provider: Arc<P>, queue: BroadcastQueue) -> JoinHandle<Result<(), PegError>>
    where
        P: EthereumProvider + 'static,
    {
        let peg = Peg::new(
            provider,
            TxGenerator::new(Arc::clone(&self.signer) as Arc<dyn TransactionSigner>),
            queue,
            self.config.peg_params(),
            &self.peg_handle,
        );
        tokio::spawn(peg.run(self.shutdown_tx.subscribe()))
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        info!("[node] Initiating graceful shutdown");
        self.shutdown_tx.send_replace(true);
    }

    /// Run until Ctrl+C or a broadcaster failure, then stop every task.
    pub async fn run_until_shutdown(&self) -> Result<()> {
        let mut tasks = self.start();

        let outcome = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl+C")?;
                info!("[node] Ctrl+C received");
                Ok(())
            }
            result = &mut tasks.broadcaster => {
                match result.context("broadcaster task panicked")? {
                    Ok(stats) => {
                        warn!(accepted = stats.accepted, rejected = stats.rejected, "[node] Broadcaster ended early");
                        Ok(())
                    }
                    Err(err) => {
                        error!(error = %err, "[node] Broadcaster failed");
                        Err(anyhow::Error::new(err).context("broadcaster"))
                    }
                }
            }
        };

        self.shutdown();
        match tasks.peg.await.context("peg task panicked")? {
            Ok(()) => {}
            Err(err) => warn!(error = %err, "[node] Peg stopped with error"),
        }
        tasks.driver.await.context("block driver task panicked")?;
        if let Some(miner) = tasks.eth_miner {
            miner.await.context("miner task panicked")?;
        }
        tasks.order_feed.await.context("order feed task panicked")?;
        if !tasks.broadcaster.is_finished() {
            tasks.broadcaster.abort();
        }

        info!("[node] Shutdown complete");
        outcome
    }
}

/// Log every order batch the tracker publishes.
async fn order_feed(tracker: Arc<QueuedOrderTracker>, mut shutdown: watch::Receiver<bool>) {
    let mut batches = tracker.subscribe();
    loop {
        tokio::select! {
            batch = batches.recv() => match batch {
                Ok(batch) => info!(
                    sequence = batch.sequence,
                    orders = batch.orders.len(),
                    "[node] Order batch committed"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[node] Order feed lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}
