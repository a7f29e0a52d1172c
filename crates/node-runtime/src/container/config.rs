//! # Node Configuration
//!
//! Configuration for every subsystem the node wires together, loaded from
//! `PC_*` environment variables on top of the defaults below.
//!
//! | Variable | Default | Section |
//! |----------|---------|---------|
//! | `PC_VALIDATOR_SEED` | required | 32-byte hex ed25519 seed |
//! | `PC_VALIDATOR_POWER` | `10` | genesis voting power |
//! | `PC_ROUND_DRIFT_POLICY` | `warn` | `warn` or `strict` |
//! | `PC_FINALITY_THRESHOLD` | `12` | Ethereum confirmations |
//! | `PC_PERIOD_LENGTH` | `25` | round length in Ethereum blocks |
//! | `PC_PERIOD_LIMIT` | `1000` | orders per round |
//! | `PC_MAX_ORDER_BYTES` | `15000` | order size cap |
//! | `PC_CONFIRMATION_THRESHOLD` | `1` | witness votes before validators vote |
//! | `PC_RECONNECT_BASE_MS` / `PC_RECONNECT_MAX_MS` | `500` / `30000` | peg backoff |
//! | `PC_BLOCK_INTERVAL_MS` | `1000` | dev chain block time |
//! | `PC_ETH_BLOCK_INTERVAL_MS` | `1000` | dev Ethereum block time |
//! | `PC_MAX_BLOCK_TXS` | `1000` | txs per dev block |
//! | `PC_MEMPOOL_CAPACITY` | `10000` | dev mempool size |
//! | `PC_DEV_STAKES` | empty | `0xaddr=amount,...` staked at dev start |
//! | `PC_ETH_WS_URL` | unset | Ethereum node WebSocket; unset runs the dev chain |
//! | `PC_STAKING_CONTRACT` | required with `PC_ETH_WS_URL` | staking contract address |

use pc_03_state_store::ConsensusParams;
use pc_05_state_machine::RoundDriftPolicy;
use pc_06_peg::PegConfig as PegParams;
use shared_types::{bigint, EthAddress, U256};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub abci: AbciConfig,
    pub consensus: ConsensusConfig,
    pub peg: PegConfig,
    pub validator_key: ValidatorKeyConfig,
    pub dev_chain: DevChainConfig,
    pub ethereum: EthereumConfig,
}

impl NodeConfig {
    /// Genesis consensus parameters.
    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams {
            finality_threshold: self.consensus.finality_threshold,
            period_length: self.consensus.period_length,
            period_limit: self.consensus.period_limit,
            max_order_bytes: self.consensus.max_order_bytes,
            confirmation_threshold: self.consensus.confirmation_threshold,
        }
    }

    /// Peg parameters; round timing comes from the consensus section.
    pub fn peg_params(&self) -> PegParams {
        PegParams {
            finality_threshold: self.consensus.finality_threshold,
            period_length: self.consensus.period_length,
            period_limit: self.consensus.period_limit,
            reconnect_base: self.peg.reconnect_base,
            reconnect_max: self.peg.reconnect_max,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key}='{value}' is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// State machine settings.
#[derive(Debug, Clone, Default)]
pub struct AbciConfig {
    pub round_drift_policy: RoundDriftPolicy,
}

/// Genesis consensus parameters.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    pub finality_threshold: u64,
    pub period_length: u64,
    pub period_limit: u64,
    pub max_order_bytes: usize,
    pub confirmation_threshold: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let params = ConsensusParams::default();
        Self {
            finality_threshold: params.finality_threshold,
            period_length: params.period_length,
            period_limit: params.period_limit,
            max_order_bytes: params.max_order_bytes,
            confirmation_threshold: params.confirmation_threshold,
        }
    }
}

/// Peg reconnect settings.
#[derive(Debug, Clone)]
pub struct PegConfig {
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
}

impl Default for PegConfig {
    fn default() -> Self {
        let params = PegParams::default();
        Self {
            reconnect_base: params.reconnect_base,
            reconnect_max: params.reconnect_max,
        }
    }
}

/// Local validator identity.
#[derive(Clone)]
pub struct ValidatorKeyConfig {
    /// ed25519 seed. Required.
    pub seed: Option<[u8; 32]>,
    /// Genesis voting power.
    pub power: u64,
}

impl Default for ValidatorKeyConfig {
    fn default() -> Self {
        Self {
            seed: None,
            power: 10,
        }
    }
}

impl std::fmt::Debug for ValidatorKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorKeyConfig")
            .field("seed", &self.seed.map(|_| "<redacted>"))
            .field("power", &self.power)
            .finish()
    }
}

/// Single-node block driver settings.
#[derive(Debug, Clone)]
pub struct DevChainConfig {
    pub block_interval: Duration,
    pub eth_block_interval: Duration,
    pub max_block_txs: usize,
    pub mempool_capacity: usize,
    /// Poster stakes emitted on the dev Ethereum chain at startup.
    pub stakes: Vec<(EthAddress, U256)>,
}

impl Default for DevChainConfig {
    fn default() -> Self {
        Self {
            block_interval: Duration::from_millis(1000),
            eth_block_interval: Duration::from_millis(1000),
            max_block_txs: 1000,
            mempool_capacity: 10_000,
            stakes: Vec::new(),
        }
    }
}

/// External Ethereum node. Without one the node mines its own dev chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthereumConfig {
    pub ws_url: Option<String>,
    pub staking_contract: Option<EthAddress>,
}

impl EthereumConfig {
    /// WebSocket URL and contract, when an external node is configured.
    pub fn endpoint(&self) -> Option<(&str, EthAddress)> {
        match (&self.ws_url, self.staking_contract) {
            (Some(url), Some(contract)) => Some((url.as_str(), contract)),
            _ => None,
        }
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    load_config_from(|key| env::var(key).ok())
}

/// Load configuration through `lookup`, which maps variable names to values.
pub fn load_config_from<F>(lookup: F) -> Result<NodeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = NodeConfig::default();
    let env = Env(&lookup);

    config.validator_key.seed = Some(
        env.get("PC_VALIDATOR_SEED")
            .ok_or(ConfigError::Missing("PC_VALIDATOR_SEED"))
            .and_then(|value| parse_seed("PC_VALIDATOR_SEED", &value))?,
    );
    env.parse_into("PC_VALIDATOR_POWER", &mut config.validator_key.power)?;

    env.parse_into("PC_ROUND_DRIFT_POLICY", &mut config.abci.round_drift_policy)?;

    env.parse_into("PC_FINALITY_THRESHOLD", &mut config.consensus.finality_threshold)?;
    env.parse_into("PC_PERIOD_LENGTH", &mut config.consensus.period_length)?;
    env.parse_into("PC_PERIOD_LIMIT", &mut config.consensus.period_limit)?;
    env.parse_into("PC_MAX_ORDER_BYTES", &mut config.consensus.max_order_bytes)?;
    env.parse_into(
        "PC_CONFIRMATION_THRESHOLD",
        &mut config.consensus.confirmation_threshold,
    )?;

    env.millis_into("PC_RECONNECT_BASE_MS", &mut config.peg.reconnect_base)?;
    env.millis_into("PC_RECONNECT_MAX_MS", &mut config.peg.reconnect_max)?;

    env.millis_into("PC_BLOCK_INTERVAL_MS", &mut config.dev_chain.block_interval)?;
    env.millis_into("PC_ETH_BLOCK_INTERVAL_MS", &mut config.dev_chain.eth_block_interval)?;
    env.parse_into("PC_MAX_BLOCK_TXS", &mut config.dev_chain.max_block_txs)?;
    env.parse_into("PC_MEMPOOL_CAPACITY", &mut config.dev_chain.mempool_capacity)?;
    if let Some(value) = env.get("PC_DEV_STAKES") {
        config.dev_chain.stakes = parse_stakes("PC_DEV_STAKES", &value)?;
    }

    config.ethereum.ws_url = env.get("PC_ETH_WS_URL").map(|url| url.trim().to_string());
    if let Some(value) = env.get("PC_STAKING_CONTRACT") {
        let contract = value.trim().parse::<EthAddress>().map_err(|e| ConfigError::Invalid {
            key: "PC_STAKING_CONTRACT",
            value: value.clone(),
            reason: e.to_string(),
        })?;
        config.ethereum.staking_contract = Some(contract);
    }
    if config.ethereum.ws_url.is_some() && config.ethereum.staking_contract.is_none() {
        return Err(ConfigError::Missing("PC_STAKING_CONTRACT"));
    }

    if config.consensus.period_length == 0 {
        return Err(ConfigError::Invalid {
            key: "PC_PERIOD_LENGTH",
            value: "0".into(),
            reason: "must be positive".into(),
        });
    }
    Ok(config)
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn parse_into<T>(&self, key: &'static str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(key) {
            *target = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn millis_into(&self, key: &'static str, target: &mut Duration) -> Result<(), ConfigError> {
        let mut millis = target.as_millis() as u64;
        self.parse_into(key, &mut millis)?;
        *target = Duration::from_millis(millis);
        Ok(())
    }
}

fn parse_seed(key: &'static str, value: &str) -> Result<[u8; 32], ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        key,
        value: "<redacted>".into(),
        reason,
    };
    let bytes = hex::decode(value.trim().trim_start_matches("0x"))
        .map_err(|e| invalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| invalid(format!("expected 32 bytes, got {}", bytes.len())))
}

fn parse_stakes(key: &'static str, value: &str) -> Result<Vec<(EthAddress, U256)>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = |reason: String| ConfigError::Invalid {
                key,
                value: entry.to_string(),
                reason,
            };
            let (address, amount) = entry
                .split_once('=')
                .ok_or_else(|| invalid("expected address=amount".into()))?;
            let address = address.parse::<EthAddress>().map_err(|e| invalid(e.to_string()))?;
            let amount = bigint::parse(amount).map_err(|e| invalid(e.to_string()))?;
            Ok((address, amount))
        })
        .collect()
}
