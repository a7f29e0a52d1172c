//! Builds the signed transactions the peg submits.

use crate::domain::errors::PegError;
use crate::domain::events::StakeEvent;
use pc_02_signer::TransactionSigner;
use shared_types::{LimitMap, RebalanceData, RoundParams, SignedTransaction, TxKind};
use std::sync::Arc;

#[derive(Clone)]
pub struct TxGenerator {
    signer: Arc<dyn TransactionSigner>,
}

impl TxGenerator {
    pub fn new(signer: Arc<dyn TransactionSigner>) -> Self {
        Self { signer }
    }

    /// `witness` transaction reporting a matured stake event.
    pub fn witness(&self, event: &StakeEvent) -> Result<SignedTransaction, PegError> {
        let data = serde_json::to_value(event.to_witness())
            .map_err(|e| PegError::Payload(e.to_string()))?;
        Ok(self.signer.create(TxKind::Witness, data)?)
    }

    /// `rebalance` transaction proposing the next round.
    pub fn rebalance(
        &self,
        round: RoundParams,
        limits: LimitMap,
    ) -> Result<SignedTransaction, PegError> {
        let data = serde_json::to_value(RebalanceData { round, limits })
            .map_err(|e| PegError::Payload(e.to_string()))?;
        Ok(self.signer.create(TxKind::Rebalance, data)?)
    }
}
