//! # Query Surface
//!
//! Read-only JSON views of committed state.
//!
//! | Path | Value |
//! |------|-------|
//! | `round` | current round parameters |
//! | `posters` | all posters |
//! | `posters/<0xaddress>` | one poster |
//! | `events` | pending events by block |
//! | `validators` | all validators |
//! | `validators/<nodeId>` | one validator |
//! | `consensus` | consensus parameters |
//! | `orderCounter` | accepted order count |
//! | `lastEvent` | last applied event heights |

use crate::domain::abci::{QueryResponse, CODE_OK, CODE_REJECTED};
use crate::ports::outbound::RoundSync;
use crate::service::StateMachine;
use pc_04_handlers::OrderTracker;
use serde::Serialize;
use shared_types::{EthAddress, NodeId};

impl<T: OrderTracker, R: RoundSync> StateMachine<T, R> {
    /// Answer a query against committed state.
    pub fn query(&self, path: &str) -> QueryResponse {
        let state = &self.commit_state;
        let height = state.last_block_height;
        let path = path.trim_matches('/');

        let result = match path.split_once('/') {
            None => match path {
                "round" => render(&state.round),
                "posters" => render(&state.posters),
                "events" => render(&state.events),
                "validators" => render(&state.validators),
                "consensus" => render(&state.consensus_params),
                "orderCounter" => render(&state.order_counter),
                "lastEvent" => render(&state.last_event),
                other => Err(format!("unknown query path '{other}'")),
            },
            Some(("posters", address)) => address
                .parse::<EthAddress>()
                .map_err(|e| e.to_string())
                .and_then(|address| {
                    state
                        .posters
                        .get(&address)
                        .ok_or_else(|| format!("poster {address} not found"))
                })
                .and_then(render),
            Some(("validators", node_id)) => node_id
                .parse::<NodeId>()
                .map_err(|e| e.to_string())
                .and_then(|node_id| {
                    state
                        .validators
                        .get(&node_id)
                        .ok_or_else(|| format!("validator {node_id} not found"))
                })
                .and_then(render),
            Some(_) => Err(format!("unknown query path '{path}'")),
        };

        match result {
            Ok(value) => QueryResponse {
                code: CODE_OK,
                value,
                log: String::new(),
                height,
            },
            Err(log) => QueryResponse {
                code: CODE_REJECTED,
                value: Vec::new(),
                log,
                height,
            },
        }
    }
}

fn render<V: Serialize + ?Sized>(value: &V) -> Result<Vec<u8>, String> {
    serde_json::to_vec(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use crate::service::test_support::*;
    use pc_02_signer::TransactionSigner;
    use serde_json::Value;
    use shared_types::{EthAddress, StakeKind};

    fn json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_top_level_paths() {
        let machine = machine_with_validators(&[1]);
        for path in [
            "round",
            "posters",
            "events",
            "validators",
            "consensus",
            "orderCounter",
            "lastEvent",
        ] {
            let response = machine.query(path);
            assert_eq!(response.code, 0, "{path}: {}", response.log);
        }
        assert_eq!(json(&machine.query("orderCounter").value), 0);
        assert_eq!(json(&machine.query("/round/").value)["number"], 0);
    }

    #[test]
    fn test_single_entity_paths() {
        let mut machine = machine_with_validators(&[1]);
        let address = EthAddress([8; 20]);
        machine
            .commit_state
            .apply_poster_stake(StakeKind::Add, address, 12u64.into());

        let poster = machine.query(&format!("posters/{address}"));
        assert_eq!(json(&poster.value)["balance"], "12n");

        let node_id = signer(1).node_id();
        let validator = machine.query(&format!("validators/{node_id}"));
        assert_eq!(json(&validator.value)["genesis"], true);
    }

    #[test]
    fn test_unknown_and_missing() {
        let machine = machine_with_validators(&[1]);
        assert_eq!(machine.query("balances").code, 1);
        assert_eq!(machine.query("posters/0x1234").code, 1);
        assert_eq!(
            machine
                .query(&format!("posters/{}", EthAddress([3; 20])))
                .code,
            1
        );
        assert_eq!(machine.query("round/extra").code, 1);
    }

    #[test]
    fn test_query_reads_committed_state_only() {
        let mut machine = machine_with_validators(&[1]);
        machine
            .deliver_state
            .apply_poster_stake(StakeKind::Add, EthAddress([2; 20]), 5u64.into());
        assert_eq!(json(&machine.query("posters").value), serde_json::json!({}));
    }
}
