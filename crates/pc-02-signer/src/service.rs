//! # Signer Service
//!
//! Keypair-backed implementation of [`TransactionSigner`].

use crate::domain::errors::SignerError;
use crate::domain::keys::ValidatorKeypair;
use crate::domain::shape::validate_shape;
use crate::ports::inbound::TransactionSigner;
use serde_json::Value;
use shared_types::{canonical_bytes, NodeId, Proof, SignedTransaction, TxKind};
use tracing::trace;

/// Signs validator transactions with a node's ed25519 key.
#[derive(Debug)]
pub struct Signer {
    keypair: ValidatorKeypair,
}

impl Signer {
    pub fn new(keypair: ValidatorKeypair) -> Self {
        Self { keypair }
    }

    pub fn keypair(&self) -> &ValidatorKeypair {
        &self.keypair
    }
}

impl TransactionSigner for Signer {
    fn create(&self, kind: TxKind, data: Value) -> Result<SignedTransaction, SignerError> {
        validate_shape(kind, &data)?;

        let signature = self.keypair.sign(&canonical_bytes(&data));
        let proof = Proof {
            from: hex::encode(self.keypair.public_key()),
            from_addr: self.keypair.node_id().to_hex(),
            signature: hex::encode(signature),
        };

        trace!(tx_type = %kind, signer = %proof.from_addr, "[pc-02] Signed transaction");

        Ok(SignedTransaction {
            tx_type: kind.as_str().to_string(),
            data,
            proof: Some(proof),
        })
    }

    fn node_id(&self) -> NodeId {
        self.keypair.node_id()
    }
}
