//! # Validator Keys
//!
//! Ed25519 keypair used to sign validator-originated transactions.
//!
//! ## Security Properties
//!
//! - Deterministic signatures (nonce derived from key and message)
//! - Secret scalar is zeroized when the `SigningKey` is dropped

use ed25519_dalek::{Signer as _, SigningKey};
use shared_types::{NodeId, PublicKey, Signature};

/// Ed25519 keypair of a validator node.
pub struct ValidatorKeypair {
    signing_key: SigningKey,
}

impl ValidatorKeypair {
    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Node id derived from the public key.
    pub fn node_id(&self) -> NodeId {
        NodeId::from_public_key(&self.public_key())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for ValidatorKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorKeypair")
            .field("node_id", &self.node_id())
            .finish_non_exhaustive()
    }
}
