//! # Outbound Ports (Driven Ports / SPI)

use crate::domain::abci::ValidatorUpdate;
use pc_03_state_store::State;
use shared_types::RoundParams;

/// Receives newly committed round parameters (the peg).
pub trait RoundSync: Send + Sync {
    fn synchronize(&self, round: RoundParams);
}

/// Round sync for nodes that run without a peg.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoundSync;

impl RoundSync for NoRoundSync {
    fn synchronize(&self, _round: RoundParams) {}
}

/// Decides validator-set changes at the end of a block.
///
/// Implementations may mark validators as `applied` in `state`; any change
/// they make is part of the block's deterministic execution.
pub trait ValidatorPowerPolicy: Send + Sync {
    fn validator_updates(&self, state: &mut State, height: u64) -> Vec<ValidatorUpdate>;
}

/// The default policy: the validator set never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidatorUpdates;

impl ValidatorPowerPolicy for NoValidatorUpdates {
    fn validator_updates(&self, _state: &mut State, _height: u64) -> Vec<ValidatorUpdate> {
        Vec::new()
    }
}
