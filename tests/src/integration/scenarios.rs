//! # Ledger Scenarios
//!
//! Staking, rounds, orders and witness confirmation driven through the ABCI
//! surface with real signatures and wire encoding.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use k256::ecdsa::SigningKey;
    use pc_03_state_store::ConsensusParams;
    use pc_04_handlers::{gen_limits, OrderBatch};
    use pc_05_state_machine::StateMachineConfig;
    use serde_json::Value;
    use shared_types::{EthAddress, LimitMap, StakeKind, TxKind, WitnessData, U256};

    const V1: u8 = 1;
    const V2: u8 = 2;
    const V3: u8 = 3;

    /// Stake `balance` for the poster and run rounds 1 and 2 so that the
    /// poster holds `order_limit` orders. Returns the next block height.
    fn fund_poster(machine: &mut TestMachine, poster: EthAddress, balance: u64, order_limit: u64) -> u64 {
        let signer = validator(V1);
        let stake = poster_stake(StakeKind::Add, poster, balance, 10);
        let (responses, _) = run_block(
            machine,
            1,
            &[V1],
            &[
                witness_tx(&signer, &stake),
                rebalance_tx(&signer, round(1, 10, 15, order_limit), LimitMap::new()),
            ],
        );
        assert!(responses.iter().all(|r| r.is_ok()), "{responses:?}");

        let limits = gen_limits([(poster, U256::from(balance))], order_limit);
        let (responses, _) = run_block(
            machine,
            2,
            &[V1],
            &[rebalance_tx(&signer, round(2, 15, 20, order_limit), limits)],
        );
        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(machine.commit_state().order_quota(&poster), order_limit);
        3
    }

    fn funded(order_limit: u64) -> (TestMachine, SigningKey, EthAddress, u64) {
        let mut machine = machine(&[V1], ConsensusParams::default());
        let key = poster_key(9);
        let poster = poster_address(&key);
        let height = fund_poster(&mut machine, poster, 500, order_limit);
        (machine, key, poster, height)
    }

    #[test]
    fn test_genesis_round_sets_boundaries_only() {
        let sync = RecordingRoundSync::default();
        let mut machine = machine_with_config(
            &[V1],
            ConsensusParams::default(),
            StateMachineConfig::default(),
            sync.clone(),
        );
        assert_eq!(machine.commit_state().round.number, 0);

        let (responses, _) = run_block(
            &mut machine,
            1,
            &[V1],
            &[rebalance_tx(&validator(V1), round(1, 100, 105, 1000), LimitMap::new())],
        );
        assert!(responses[0].is_ok(), "{}", responses[0].log);

        let state = machine.commit_state();
        assert_eq!(state.round.number, 1);
        assert_eq!(state.round.starts_at, 100);
        assert_eq!(state.round.ends_at, 105);
        assert!(state.posters.is_empty());
        assert_eq!(*sync.0.lock(), vec![round(1, 100, 105, 1000)]);
    }

    #[test]
    fn test_two_posters_split_the_limit() {
        let mut machine = machine(&[V1], ConsensusParams::default());
        let signer = validator(V1);
        let a = EthAddress([0xa1; 20]);
        let b = EthAddress([0xb2; 20]);

        // Both stakes land in the same Ethereum block.
        let (responses, _) = run_block(
            &mut machine,
            1,
            &[V1],
            &[
                witness_tx(&signer, &poster_stake(StakeKind::Add, a, 300, 4)),
                witness_tx(&signer, &poster_stake(StakeKind::Add, b, 700, 4)),
                rebalance_tx(&signer, round(1, 4, 9, 1000), LimitMap::new()),
            ],
        );
        assert!(responses.iter().all(|r| r.is_ok()), "{responses:?}");
        assert_eq!(machine.commit_state().posters[&b].balance, U256::from(700u64));

        let limits = gen_limits([(a, U256::from(300u64)), (b, U256::from(700u64))], 1000);
        assert_eq!(limits[&a].order_limit, 300);
        assert_eq!(limits[&b].order_limit, 700);
        assert_eq!(limits[&a].stream_limit, 1);
        assert_eq!(limits[&b].stream_limit, 1);

        let (responses, _) = run_block(
            &mut machine,
            2,
            &[V1],
            &[rebalance_tx(&signer, round(2, 9, 14, 1000), limits)],
        );
        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(machine.commit_state().order_quota(&a), 300);
        assert_eq!(machine.commit_state().order_quota(&b), 700);
    }

    #[test]
    fn test_wrong_limits_are_rejected() {
        let mut machine = machine(&[V1], ConsensusParams::default());
        let signer = validator(V1);
        let a = EthAddress([0xa1; 20]);
        run_block(
            &mut machine,
            1,
            &[V1],
            &[
                witness_tx(&signer, &poster_stake(StakeKind::Add, a, 300, 4)),
                rebalance_tx(&signer, round(1, 4, 9, 1000), LimitMap::new()),
            ],
        );

        let inflated = gen_limits([(a, U256::from(300u64))], 2000);
        let response = machine.check_tx(&rebalance_tx(&signer, round(2, 9, 14, 1000), inflated));
        assert_eq!(response.tag(), Some("limits"));

        let skipped = machine.check_tx(&rebalance_tx(&signer, round(3, 9, 14, 1000), LimitMap::new()));
        assert_eq!(skipped.tag(), Some("round"));
    }

    #[test]
    fn test_second_order_in_block_exhausts_quota() {
        let (mut machine, key, poster, height) = funded(1);
        let (responses, _) = run_block(
            &mut machine,
            height,
            &[V1],
            &[order_tx(&key, 1), order_tx(&key, 2)],
        );

        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(responses[1].tag(), Some("noStake"));
        assert_eq!(machine.commit_state().order_quota(&poster), 0);
        assert_eq!(machine.commit_state().order_counter, 1);
    }

    #[test]
    fn test_check_tx_never_consumes_quota() {
        let (mut machine, key, poster, height) = funded(5);
        let before = machine.commit_state().clone();

        let order = order_tx(&key, 1);
        for _ in 0..10 {
            assert!(machine.check_tx(&order).is_ok());
        }
        assert_eq!(machine.commit_state(), &before);

        let (responses, _) = run_block(&mut machine, height, &[V1], &[order]);
        assert!(responses[0].is_ok());
        assert_eq!(machine.commit_state().order_quota(&poster), 4);
        assert_eq!(machine.commit_state().order_counter, before.order_counter + 1);
    }

    #[test]
    fn test_accepted_orders_are_published_at_commit() {
        let (mut machine, key, poster, height) = funded(5);
        let mut batches = machine.tracker().subscribe();

        begin(&mut machine, height, &[V1]);
        let response = machine.deliver_tx(&order_tx(&key, 7));
        assert!(response.is_ok());
        assert!(batches.try_recv().is_err());

        machine.end_block(height);
        machine.commit();
        let batch: std::sync::Arc<OrderBatch> = batches.try_recv().unwrap();
        assert_eq!(batch.orders.len(), 1);
        assert_eq!(batch.orders[0].poster, poster);
        assert_eq!(batch.orders[0].kind, TxKind::Order);
        assert!(batch.orders[0].id.starts_with("0x"));
    }

    #[test]
    fn test_stream_uses_its_own_quota() {
        let (mut machine, key, poster, height) = funded(5);
        let (responses, _) = run_block(
            &mut machine,
            height,
            &[V1],
            &[stream_tx(&key, 1), stream_tx(&key, 2)],
        );

        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(responses[1].tag(), Some("noStake"));
        assert_eq!(machine.commit_state().order_quota(&poster), 5);
        assert_eq!(machine.commit_state().stream_quota(&poster), 0);
        assert_eq!(machine.commit_state().order_counter, 0);
    }

    #[test]
    fn test_unstaked_poster_is_refused() {
        let mut machine = machine(&[V1], ConsensusParams::default());
        let response = machine.check_tx(&order_tx(&poster_key(4), 1));
        assert_eq!(response.tag(), Some("noStake"));
    }

    #[test]
    fn test_oversized_order() {
        let params = ConsensusParams {
            max_order_bytes: 64,
            ..ConsensusParams::default()
        };
        let machine = machine(&[V1], params);
        let response = machine.check_tx(&order_tx(&poster_key(4), 1));
        assert_eq!(response.tag(), Some("oversized"));
    }

    #[test]
    fn test_two_validators_confirm_a_stake() {
        let params = ConsensusParams {
            confirmation_threshold: 2,
            ..ConsensusParams::default()
        };
        let mut machine = machine(&[V1, V2, V3], params);
        let poster = EthAddress([0x55; 20]);
        let event = poster_stake(StakeKind::Add, poster, 500, 10);

        begin(&mut machine, 1, &[V1, V2, V3]);
        assert_eq!(machine.deliver_state().consensus_params.confirmation_threshold, 2);

        let first = machine.deliver_tx(&witness_tx(&validator(V1), &event));
        assert!(first.is_ok(), "{}", first.log);
        assert!(machine.deliver_state().posters.is_empty());
        assert!(machine.deliver_state().events.contains_block(10));

        let second = machine.deliver_tx(&witness_tx(&validator(V2), &event));
        assert!(second.is_ok(), "{}", second.log);
        assert_eq!(machine.deliver_state().posters[&poster].balance, U256::from(500u64));
        assert!(!machine.deliver_state().events.contains_block(10));

        let late = machine.deliver_tx(&witness_tx(&validator(V3), &event));
        assert_eq!(late.tag(), Some("stale"));

        machine.end_block(1);
        machine.commit();
        assert_eq!(machine.commit_state().posters[&poster].balance, U256::from(500u64));
        assert_eq!(machine.commit_state().last_event.add, 10);
    }

    #[test]
    fn test_resubmitted_vote_does_not_confirm() {
        let mut machine = machine(&[V1, V2, V3], ConsensusParams::default());
        let poster = EthAddress([0x56; 20]);
        let event = poster_stake(StakeKind::Add, poster, 500, 10);

        let (responses, _) = run_block(
            &mut machine,
            1,
            &[V1, V2, V3],
            &[
                witness_tx(&validator(V1), &event),
                witness_tx(&validator(V1), &event),
            ],
        );
        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(responses[1].tag(), Some("duplicateVote"));
        assert!(machine.commit_state().posters.is_empty());
        assert_eq!(machine.commit_state().events.get(10, &event.id).unwrap().conf, 1);

        // Mempool refuses the repeat too, but still admits another validator.
        assert_eq!(
            machine.check_tx(&witness_tx(&validator(V1), &event)).tag(),
            Some("duplicateVote")
        );
        let (responses, _) = run_block(&mut machine, 2, &[V1, V2, V3], &[witness_tx(&validator(V2), &event)]);
        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(machine.commit_state().posters[&poster].balance, U256::from(500u64));
    }

    #[test]
    fn test_pending_votes_carry_across_blocks() {
        // five active validators: threshold floor(10 / 3) = 3
        let voters = [1, 2, 3, 4, 5];
        let mut machine = machine(&voters, ConsensusParams::default());
        let poster = EthAddress([0x66; 20]);
        let event = poster_stake(StakeKind::Add, poster, 42, 3);

        let (responses, _) = run_block(
            &mut machine,
            1,
            &voters,
            &[
                witness_tx(&validator(1), &event),
                witness_tx(&validator(2), &event),
            ],
        );
        assert!(responses.iter().all(|r| r.is_ok()));
        assert_eq!(machine.commit_state().consensus_params.confirmation_threshold, 3);
        assert!(machine.commit_state().posters.is_empty());
        assert!(machine.commit_state().events.contains_block(3));

        let (responses, _) = run_block(&mut machine, 2, &voters, &[witness_tx(&validator(3), &event)]);
        assert!(responses[0].is_ok());
        assert_eq!(machine.commit_state().posters[&poster].balance, U256::from(42u64));
        assert!(machine.commit_state().events.is_empty());
    }

    #[test]
    fn test_witness_rejections() {
        let mut machine = machine(&[V1], ConsensusParams::default());
        let poster = EthAddress([0x77; 20]);
        let event = poster_stake(StakeKind::Add, poster, 10, 5);

        let outsider = machine.check_tx(&witness_tx(&validator(42), &event));
        assert_eq!(outsider.tag(), Some("badSig"));

        let mut forged: WitnessData = event.clone();
        forged.amount = U256::from(11u64);
        assert_eq!(machine.check_tx(&witness_tx(&validator(V1), &forged)).tag(), Some("idMismatch"));

        run_block(&mut machine, 1, &[V1], &[witness_tx(&validator(V1), &event)]);
        let older = poster_stake(StakeKind::Add, poster, 10, 4);
        assert_eq!(machine.check_tx(&witness_tx(&validator(V1), &older)).tag(), Some("stale"));

        // removals are tracked separately from additions
        let removal = poster_stake(StakeKind::Remove, poster, 4, 4);
        let (responses, _) = run_block(&mut machine, 2, &[V1], &[witness_tx(&validator(V1), &removal)]);
        assert!(responses[0].is_ok(), "{}", responses[0].log);
        assert_eq!(machine.commit_state().posters[&poster].balance, U256::from(6u64));
    }

    #[test]
    fn test_query_reflects_commits() {
        let (machine, _key, poster, _) = funded(3);
        let response = machine.query(&format!("posters/{poster}"));
        assert_eq!(response.code, 0, "{}", response.log);
        let poster: Value = serde_json::from_slice(&response.value).unwrap();
        assert_eq!(poster["balance"], "500n");
        assert_eq!(poster["orderLimit"], 3);

        let round: Value = serde_json::from_slice(&machine.query("round").value).unwrap();
        assert_eq!(round["number"], 2);
    }

    #[test]
    fn test_garbage_and_unknown_types() {
        let machine = machine(&[V1], ConsensusParams::default());
        assert_eq!(machine.check_tx(b"%%%").tag(), Some("decompress"));

        let unknown = encode(&shared_types::SignedTransaction {
            tx_type: "mint".into(),
            data: serde_json::json!({}),
            proof: None,
        });
        assert_eq!(machine.check_tx(&unknown).tag(), Some("txType"));
    }
}
