//! # Replica Determinism
//!
//! Independent state machines fed the same blocks must agree on every app
//! hash; commit policy must behave the same on every replica.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pc_03_state_store::ConsensusParams;
    use pc_04_handlers::gen_limits;
    use pc_05_state_machine::{RoundDriftPolicy, StateMachineConfig};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::{EthAddress, Hash, LimitMap, StakeKind, U256};
    use std::collections::BTreeMap;

    /// A random but reproducible history: stakes, rounds and orders.
    fn history(seed: u64) -> Vec<Vec<Vec<u8>>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let signer = validator(1);
        let keys: Vec<_> = (1..=4).map(poster_key).collect();
        let mut balances: BTreeMap<EthAddress, U256> = BTreeMap::new();
        let mut blocks = Vec::new();
        let mut eth_block = 10;

        // Genesis stakes all land in one Ethereum block.
        let mut first = Vec::new();
        for key in &keys {
            let amount = rng.gen_range(1..1_000u64);
            let address = poster_address(key);
            *balances.entry(address).or_default() += U256::from(amount);
            first.push(witness_tx(&signer, &poster_stake(StakeKind::Add, address, amount, eth_block)));
        }
        first.push(rebalance_tx(&signer, round(1, eth_block, eth_block + 5, 100), LimitMap::new()));
        blocks.push(first);

        let limits = gen_limits(balances.iter().map(|(a, b)| (*a, *b)), 100);
        blocks.push(vec![rebalance_tx(&signer, round(2, eth_block + 5, eth_block + 10, 100), limits)]);

        for nonce in 0..6u64 {
            eth_block += 1;
            let mut block = Vec::new();
            for _ in 0..rng.gen_range(1..5) {
                let key = &keys[rng.gen_range(0..keys.len())];
                block.push(order_tx(key, nonce * 100 + rng.gen_range(0..100)));
            }
            let key = &keys[rng.gen_range(0..keys.len())];
            block.push(witness_tx(
                &signer,
                &poster_stake(StakeKind::Add, poster_address(key), rng.gen_range(1..50), eth_block),
            ));
            blocks.push(block);
        }
        blocks
    }

    fn replay(blocks: &[Vec<Vec<u8>>]) -> Vec<Hash> {
        let mut machine = machine(&[1], ConsensusParams::default());
        blocks
            .iter()
            .enumerate()
            .map(|(i, txs)| run_block(&mut machine, i as u64 + 1, &[1], txs).1)
            .collect()
    }

    #[test]
    fn test_replicas_agree_on_every_hash() {
        for seed in [1, 7, 42] {
            let blocks = history(seed);
            assert_eq!(replay(&blocks), replay(&blocks), "seed {seed}");
        }
    }

    #[test]
    fn test_different_histories_diverge() {
        assert_ne!(replay(&history(1)).last(), replay(&history(2)).last());
    }

    #[test]
    fn test_rejected_transactions_do_not_change_the_hash() {
        let mut clean = machine(&[1], ConsensusParams::default());
        let mut noisy = machine(&[1], ConsensusParams::default());

        let (_, a) = run_block(&mut clean, 1, &[1], &[]);
        let (responses, b) = run_block(
            &mut noisy,
            1,
            &[1],
            &[b"junk".to_vec(), order_tx(&poster_key(3), 1)],
        );
        assert!(responses.iter().all(|r| !r.is_ok()));
        assert_eq!(a, b);
    }

    fn two_rounds_in_one_block(
        policy: RoundDriftPolicy,
    ) -> (TestMachine, RecordingRoundSync, Hash, Hash) {
        let sync = RecordingRoundSync::default();
        let mut machine = machine_with_config(
            &[1],
            ConsensusParams::default(),
            StateMachineConfig {
                round_drift_policy: policy,
                ..StateMachineConfig::default()
            },
            sync.clone(),
        );
        let (_, genesis_hash) = run_block(&mut machine, 1, &[1], &[]);

        let signer = validator(1);
        let (responses, hash) = run_block(
            &mut machine,
            2,
            &[1],
            &[
                rebalance_tx(&signer, round(1, 0, 5, 10), LimitMap::new()),
                rebalance_tx(&signer, round(2, 5, 10, 10), LimitMap::new()),
            ],
        );
        assert!(responses.iter().all(|r| r.is_ok()), "{responses:?}");
        (machine, sync, genesis_hash, hash)
    }

    #[test]
    fn test_warn_policy_commits_round_jump() {
        let (machine, sync, previous, hash) = two_rounds_in_one_block(RoundDriftPolicy::Warn);
        assert_ne!(hash, previous);
        assert_eq!(machine.commit_state().round.number, 2);
        assert_eq!(machine.commit_state().last_block_height, 2);
        assert_eq!(*sync.0.lock(), vec![round(2, 5, 10, 10)]);
    }

    #[test]
    fn test_strict_policy_discards_round_jump() {
        let (machine, sync, previous, hash) = two_rounds_in_one_block(RoundDriftPolicy::Strict);
        assert_eq!(hash, previous);
        assert_eq!(machine.commit_state().round.number, 0);
        assert_eq!(machine.commit_state().last_block_height, 1);
        assert_eq!(machine.deliver_state(), machine.commit_state());
        assert!(sync.0.lock().is_empty());
    }
}
