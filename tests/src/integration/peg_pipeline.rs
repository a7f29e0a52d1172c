//! # Peg Pipeline
//!
//! Ethereum stake → peg witness → mempool → block → round sync → rebalance →
//! poster quota → accepted order, on a single node.

#[cfg(test)]
mod tests {
    use crate::fixtures::{order_tx, poster_address, poster_key};
    use node_runtime::{NodeConfig, NodeRuntime};
    use pc_02_signer::{Signer, TransactionSigner, ValidatorKeypair};
    use pc_06_peg::{BroadcastError, Broadcaster, Peg, StakeEvent, TxGenerator};
    use shared_types::{StakeKind, TxKind, U256};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    const SEED: [u8; 32] = [9; 32];

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.validator_key.seed = Some(SEED);
        config.consensus.finality_threshold = 2;
        config.consensus.period_length = 3;
        config.consensus.period_limit = 1000;
        config
    }

    async fn wait_until<F: FnMut() -> bool>(mut condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_stake_becomes_order_quota() {
        let config = config();
        let runtime = NodeRuntime::new(config.clone()).unwrap();
        let provider = runtime.provider();
        let machine = runtime.machine();
        let driver = runtime.block_driver();

        let (broadcaster, queue) = Broadcaster::new(Arc::new(runtime.client()));
        let peg = Peg::new(
            Arc::new(provider.clone()),
            TxGenerator::new(Arc::new(Signer::new(ValidatorKeypair::from_seed(SEED)))
                as Arc<dyn TransactionSigner>),
            queue,
            config.peg_params(),
            &runtime.peg_handle(),
        );
        let (stop, stop_rx) = watch::channel(false);
        let broadcaster = tokio::spawn(broadcaster.run());
        let peg = tokio::spawn(peg.run(stop_rx));
        wait_until(|| provider.subscriber_count() == 1).await;

        let key = poster_key(5);
        let address = poster_address(&key);
        provider.emit(StakeEvent::poster(
            StakeKind::Add,
            address,
            U256::from(400u64),
            1,
        ));

        for _ in 0..40 {
            provider.mine_block();
            tokio::time::sleep(Duration::from_millis(20)).await;
            driver.produce_block();
            let machine = machine.lock();
            let state = machine.commit_state();
            if state.round.number >= 2 && state.order_quota(&address) > 0 {
                break;
            }
        }

        {
            let machine = machine.lock();
            let state = machine.commit_state();
            assert!(state.round.number >= 2, "round {}", state.round.number);
            assert_eq!(state.posters[&address].balance, U256::from(400u64));
            assert_eq!(state.order_quota(&address), 1000);
            assert_eq!(state.stream_quota(&address), 1);
        }
        let handle = runtime.peg_handle();
        let committed = machine.lock().commit_state().round;
        wait_until(|| handle.current_round() == committed).await;

        let mut batches = runtime.tracker().subscribe();
        let response = runtime.client().admit(order_tx(&key, 1)).unwrap();
        assert!(response.is_ok(), "{}", response.log);
        let block = driver.produce_block();
        assert_eq!(block.accepted, 1);

        let batch = batches.recv().await.unwrap();
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(batch.orders[0].poster, address);
        assert_eq!(batch.orders[0].kind, TxKind::Order);
        assert_eq!(machine.lock().commit_state().order_quota(&address), 999);

        stop.send(true).unwrap();
        peg.await.unwrap().unwrap();
        let stats = broadcaster.await.unwrap().unwrap();
        assert!(stats.accepted >= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_started_node_reaches_funded_round() {
        let key = poster_key(6);
        let address = poster_address(&key);
        let mut config = config();
        config.dev_chain.block_interval = Duration::from_millis(20);
        config.dev_chain.eth_block_interval = Duration::from_millis(10);
        config.dev_chain.stakes = vec![(address, U256::from(250u64))];

        let runtime = NodeRuntime::new(config).unwrap();
        let machine = runtime.machine();
        let tasks = runtime.start();

        wait_until(|| {
            let machine = machine.lock();
            let state = machine.commit_state();
            state.round.number >= 2 && state.order_quota(&address) == 1000
        })
        .await;

        runtime.shutdown();
        tasks.peg.await.unwrap().unwrap();
        tasks.driver.await.unwrap();
        tasks.eth_miner.expect("dev chain miner").await.unwrap();
        tasks.order_feed.await.unwrap();
        match tasks.broadcaster.await.unwrap() {
            Ok(stats) => assert!(stats.accepted >= 3),
            Err(err) => assert!(matches!(err, BroadcastError::Connection(_)), "{err}"),
        }

        assert_eq!(
            machine.lock().commit_state().posters[&address].balance,
            U256::from(250u64)
        );
        // The driver closed the mempool on the way out.
        assert!(matches!(
            runtime.client().admit(order_tx(&key, 1)),
            Err(BroadcastError::Connection(_))
        ));
    }
}
