//! Deterministic keys and transaction builders shared by the suites.

use k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use pc_02_signer::{Signer, TransactionSigner, ValidatorKeypair};
use pc_03_state_store::ConsensusParams;
use pc_04_handlers::{address_from_pubkey, sign_order, QueuedOrderTracker};
use pc_05_state_machine::{
    BeginBlockRequest, InitChainRequest, RoundSync, StateMachine, StateMachineConfig, TxResponse,
    ValidatorUpdate, VoteInfo,
};
use serde_json::{json, Map, Value};
use shared_types::{
    EthAddress, Hash, LimitMap, RebalanceData, RoundParams, SignedTransaction, StakeKind,
    StakeSubject, TxKind, WitnessData, U256,
};
use std::sync::Arc;

/// Records every round the state machine reports at commit.
#[derive(Clone, Default)]
pub struct RecordingRoundSync(pub Arc<Mutex<Vec<RoundParams>>>);

impl RoundSync for RecordingRoundSync {
    fn synchronize(&self, round: RoundParams) {
        self.0.lock().push(round);
    }
}

pub type TestMachine = StateMachine<QueuedOrderTracker, RecordingRoundSync>;

pub fn validator(seed: u8) -> Signer {
    Signer::new(ValidatorKeypair::from_seed([seed; 32]))
}

/// A machine whose genesis validators are the given seeds, power 10 each.
pub fn machine(seeds: &[u8], params: ConsensusParams) -> TestMachine {
    machine_with_config(
        seeds,
        params,
        StateMachineConfig::default(),
        RecordingRoundSync::default(),
    )
}

pub fn machine_with_config(
    seeds: &[u8],
    params: ConsensusParams,
    config: StateMachineConfig,
    round_sync: RecordingRoundSync,
) -> TestMachine {
    let mut machine = StateMachine::new(
        config,
        params,
        Arc::new(QueuedOrderTracker::new()),
        round_sync,
    );
    machine.init_chain(InitChainRequest {
        validators: seeds
            .iter()
            .map(|seed| ValidatorUpdate {
                pub_key: validator(*seed).keypair().public_key(),
                power: 10,
            })
            .collect(),
    });
    machine
}

/// `beginBlock` with every listed validator voting.
pub fn begin(machine: &mut TestMachine, height: u64, voters: &[u8]) {
    let proposer = voters
        .first()
        .map(|seed| validator(*seed).node_id())
        .unwrap_or_default();
    machine.begin_block(BeginBlockRequest {
        height,
        proposer_address: proposer,
        votes: voters
            .iter()
            .map(|seed| VoteInfo {
                validator: validator(*seed).node_id(),
                power: 10,
                signed_last_block: height > 1,
            })
            .collect(),
    });
}

/// Run a whole block; returns the delivery responses and the app hash.
pub fn run_block(
    machine: &mut TestMachine,
    height: u64,
    voters: &[u8],
    txs: &[Vec<u8>],
) -> (Vec<TxResponse>, Hash) {
    begin(machine, height, voters);
    let responses = txs.iter().map(|tx| machine.deliver_tx(tx)).collect();
    machine.end_block(height);
    let hash = machine.commit().data;
    (responses, hash)
}

pub fn encode(tx: &SignedTransaction) -> Vec<u8> {
    pc_01_codec::encode(tx)
        .expect("encodable transaction")
        .into_bytes()
}

pub fn poster_stake(kind: StakeKind, address: EthAddress, amount: u64, block: u64) -> WitnessData {
    WitnessData::new(
        StakeSubject::Poster,
        kind,
        U256::from(amount),
        block,
        address,
        None,
    )
}

pub fn witness_tx(signer: &Signer, witness: &WitnessData) -> Vec<u8> {
    let data = serde_json::to_value(witness).expect("witness payload");
    encode(&signer.create(TxKind::Witness, data).expect("signed witness"))
}

pub fn round(number: u64, starts_at: u64, ends_at: u64, limit: u64) -> RoundParams {
    RoundParams {
        number,
        starts_at,
        ends_at,
        limit,
    }
}

pub fn rebalance_tx(signer: &Signer, round: RoundParams, limits: LimitMap) -> Vec<u8> {
    let data = serde_json::to_value(RebalanceData { round, limits }).expect("rebalance payload");
    encode(&signer.create(TxKind::Rebalance, data).expect("signed rebalance"))
}

pub fn poster_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed.max(1); 32]).expect("valid scalar")
}

pub fn poster_address(key: &SigningKey) -> EthAddress {
    address_from_pubkey(key.verifying_key())
}

pub fn order_payload(key: &SigningKey, nonce: u64) -> Value {
    let mut maker_values = Map::new();
    maker_values.insert("makerAddress".into(), json!(poster_address(key).to_hex()));
    maker_values.insert("salt".into(), json!(nonce));
    sign_order("0x7c1e0e3e1d", maker_values, key).expect("signed order")
}

pub fn order_tx(key: &SigningKey, nonce: u64) -> Vec<u8> {
    encode(&SignedTransaction::unsigned(
        TxKind::Order,
        order_payload(key, nonce),
    ))
}

pub fn stream_tx(key: &SigningKey, nonce: u64) -> Vec<u8> {
    encode(&SignedTransaction::unsigned(
        TxKind::Stream,
        order_payload(key, nonce),
    ))
}
