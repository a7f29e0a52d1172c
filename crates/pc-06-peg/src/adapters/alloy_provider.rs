//! # Alloy Provider
//!
//! [`EthereumProvider`] over an Ethereum node's WebSocket JSON-RPC endpoint.
//! New heads and staking contract logs arrive through `eth_subscribe`;
//! backfill goes through `eth_getLogs`.
//!
//! The staking contract emits one event per stake change. `validatorKey` is
//! the staker's ed25519 consensus key, zero for posters.

use crate::domain::errors::PegError;
use crate::domain::events::StakeEvent;
use crate::ports::outbound::{EthereumProvider, ProviderEvent, Subscription};
use alloy::{
    primitives::{Address, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
    sol,
    sol_types::SolEvent,
    transports::ws::WsConnect,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{EthAddress, StakeKind, U256};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SUBSCRIPTION_CAPACITY: usize = 1024;

sol! {
    event stakeMade(address indexed staker, uint256 amount, bytes32 validatorKey);
    event stakeRemoved(address indexed staker, uint256 amount, bytes32 validatorKey);
}

/// Staking contract watcher over WebSocket.
pub struct AlloyProvider {
    ws_url: String,
    contract: Address,
    connection: Mutex<Option<DynProvider>>,
}

impl AlloyProvider {
    /// No connection is made until the first request.
    pub fn new(ws_url: impl Into<String>, contract: EthAddress) -> Self {
        Self {
            ws_url: ws_url.into(),
            contract: Address::from(contract.0),
            connection: Mutex::new(None),
        }
    }

    /// Logs of both staking events emitted by the contract.
    fn filter(&self) -> Filter {
        Filter::new()
            .address(self.contract)
            .event_signature(vec![stakeMade::SIGNATURE_HASH, stakeRemoved::SIGNATURE_HASH])
    }

    async fn connect(&self) -> Result<DynProvider, PegError> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(self.ws_url.as_str()))
            .await
            .map_err(|e| PegError::Provider(format!("connect {}: {e}", self.ws_url)))?
            .erased();
        *self.connection.lock() = Some(provider.clone());
        info!(url = %self.ws_url, contract = %self.contract, "[pc-06] Connected to Ethereum node");
        Ok(provider)
    }

    async fn provider(&self) -> Result<DynProvider, PegError> {
        let cached = self.connection.lock().clone();
        match cached {
            Some(provider) => Ok(provider),
            None => self.connect().await,
        }
    }
}

/// Decode a staking contract log. `Ok(None)` for logs that are not stake
/// changes or were removed by a reorg.
pub fn decode_stake_log(log: &Log) -> Result<Option<StakeEvent>, PegError> {
    if log.removed {
        warn!(block = ?log.block_number, "[pc-06] Ignoring log removed by reorg");
        return Ok(None);
    }
    let Some(topic) = log.topic0() else {
        return Ok(None);
    };
    let malformed = |e: alloy::sol_types::Error| PegError::MalformedLog(e.to_string());

    let (kind, staker, amount, key) = if *topic == stakeMade::SIGNATURE_HASH {
        let event = stakeMade::decode_log(log.as_ref()).map_err(malformed)?;
        (StakeKind::Add, event.staker, event.amount, event.validatorKey)
    } else if *topic == stakeRemoved::SIGNATURE_HASH {
        let event = stakeRemoved::decode_log(log.as_ref()).map_err(malformed)?;
        (StakeKind::Remove, event.staker, event.amount, event.validatorKey)
    } else {
        return Ok(None);
    };

    let block = log
        .block_number
        .ok_or_else(|| PegError::MalformedLog("log has no block number".into()))?;
    let address = EthAddress(staker.into_array());
    let amount = U256::from_big_endian(&amount.to_be_bytes::<32>());

    Ok(Some(match validator_key(key) {
        Some(public_key) => StakeEvent::validator(kind, address, amount, block, public_key),
        None => StakeEvent::poster(kind, address, amount, block),
    }))
}

fn validator_key(key: B256) -> Option<String> {
    (!key.is_zero()).then(|| hex::encode(key))
}

#[async_trait]
impl EthereumProvider for AlloyProvider {
    async fn subscribe(&self) -> Result<Subscription, PegError> {
        // A new session always starts from a fresh connection.
        let provider = self.connect().await?;
        let subscription_error = |e: alloy::transports::TransportError| {
            PegError::Subscription(e.to_string())
        };
        let mut heads = provider.subscribe_blocks().await.map_err(subscription_error)?;
        let mut logs = provider
            .subscribe_logs(&self.filter())
            .await
            .map_err(subscription_error)?;

        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        tokio::spawn(async move {
            // Keeps the connection alive for the life of the session.
            let _provider = provider;
            loop {
                let event = tokio::select! {
                    head = heads.recv() => match head {
                        Ok(header) => ProviderEvent::NewBlock(header.number),
                        Err(e) => ProviderEvent::Error(format!("new heads: {e}")),
                    },
                    log = logs.recv() => match log {
                        Ok(log) => match decode_stake_log(&log) {
                            Ok(Some(event)) => ProviderEvent::Stake(event),
                            Ok(None) => continue,
                            Err(e) => {
                                warn!(error = %e, "[pc-06] Skipping staking log");
                                continue;
                            }
                        },
                        Err(e) => ProviderEvent::Error(format!("staking logs: {e}")),
                    },
                    _ = sender.closed() => break,
                };
                let failed = matches!(event, ProviderEvent::Error(_));
                if sender.send(event).await.is_err() || failed {
                    break;
                }
            }
            debug!("[pc-06] Ethereum subscription ended");
        });
        Ok(receiver)
    }

    async fn past_events(&self, from: u64, to: u64) -> Result<Vec<StakeEvent>, PegError> {
        if from > to {
            return Ok(Vec::new());
        }
        let filter = self.filter().from_block(from).to_block(to);
        let logs = self
            .provider()
            .await?
            .get_logs(&filter)
            .await
            .map_err(|e| PegError::Provider(format!("eth_getLogs {from}..={to}: {e}")))?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match decode_stake_log(log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "[pc-06] Skipping staking log"),
            }
        }
        debug!(from, to, events = events.len(), "[pc-06] Backfilled staking logs");
        Ok(events)
    }

    async fn block_number(&self) -> Result<u64, PegError> {
        self.provider()
            .await?
            .get_block_number()
            .await
            .map_err(|e| PegError::Provider(format!("eth_blockNumber: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256 as AlloyU256;
    use shared_types::StakeSubject;

    fn rpc_log<E: SolEvent>(event: &E, block: Option<u64>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xcc),
                data: event.encode_log_data(),
            },
            block_number: block,
            ..Default::default()
        }
    }

    #[test]
    fn test_poster_stake_made() {
        let log = rpc_log(
            &stakeMade {
                staker: Address::repeat_byte(0x11),
                amount: AlloyU256::from(500u64),
                validatorKey: B256::ZERO,
            },
            Some(42),
        );
        let event = decode_stake_log(&log).unwrap().unwrap();
        assert_eq!(
            event,
            StakeEvent::poster(StakeKind::Add, EthAddress([0x11; 20]), U256::from(500u64), 42)
        );
    }

    #[test]
    fn test_validator_stake_removed_keeps_key() {
        let log = rpc_log(
            &stakeRemoved {
                staker: Address::repeat_byte(0x22),
                amount: AlloyU256::from(7u64),
                validatorKey: B256::repeat_byte(0xab),
            },
            Some(9),
        );
        let event = decode_stake_log(&log).unwrap().unwrap();
        assert_eq!(event.subject, StakeSubject::Validator);
        assert_eq!(event.kind, StakeKind::Remove);
        assert_eq!(event.public_key, Some("ab".repeat(32)));
        assert_eq!(event.block, 9);
    }

    #[test]
    fn test_large_amount_survives_conversion() {
        let amount = AlloyU256::from(10u64).pow(AlloyU256::from(30u64));
        let log = rpc_log(
            &stakeMade {
                staker: Address::repeat_byte(0x33),
                amount,
                validatorKey: B256::ZERO,
            },
            Some(1),
        );
        let event = decode_stake_log(&log).unwrap().unwrap();
        assert_eq!(event.amount, U256::exp10(30));
    }

    #[test]
    fn test_removed_and_foreign_logs_are_skipped() {
        let mut removed = rpc_log(
            &stakeMade {
                staker: Address::repeat_byte(0x11),
                amount: AlloyU256::from(1u64),
                validatorKey: B256::ZERO,
            },
            Some(3),
        );
        removed.removed = true;
        assert_eq!(decode_stake_log(&removed).unwrap(), None);

        let foreign = Log {
            inner: alloy::primitives::Log::new_unchecked(
                Address::repeat_byte(0xcc),
                vec![B256::repeat_byte(0x01)],
                Default::default(),
            ),
            block_number: Some(3),
            ..Default::default()
        };
        assert_eq!(decode_stake_log(&foreign).unwrap(), None);
    }

    #[test]
    fn test_pending_log_without_block_is_malformed() {
        let log = rpc_log(
            &stakeMade {
                staker: Address::repeat_byte(0x11),
                amount: AlloyU256::from(1u64),
                validatorKey: B256::ZERO,
            },
            None,
        );
        assert!(matches!(decode_stake_log(&log), Err(PegError::MalformedLog(_))));
    }

    #[test]
    fn test_filter_covers_both_events() {
        let provider = AlloyProvider::new("ws://127.0.0.1:8546", EthAddress([0xcc; 20]));
        let filter = provider.filter();
        assert!(filter.address.matches(&Address::repeat_byte(0xcc)));
        assert!(filter.topics[0].matches(&stakeMade::SIGNATURE_HASH));
        assert!(filter.topics[0].matches(&stakeRemoved::SIGNATURE_HASH));
    }
}
