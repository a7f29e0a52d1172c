//! # Core Domain Entities
//!
//! Identifiers shared by the state machine and the peg.
//!
//! - [`EthAddress`]: a poster's (or validator's) Ethereum account
//! - [`NodeId`]: a validator's consensus identity, derived from its ed25519 key

use crate::errors::AddressError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte hash (SHA-256 or Keccak-256).
pub type Hash = [u8; 32];

/// A 32-byte ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 64-byte ed25519 signature.
pub type Signature = [u8; 64];

/// Decode a fixed-length hex string, tolerating a `0x` prefix and either case.
fn decode_fixed<const N: usize>(input: &str) -> Result<[u8; N], AddressError> {
    let trimmed = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let bytes = hex::decode(trimmed).map_err(|_| AddressError::InvalidHex(input.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| AddressError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

// =============================================================================
// ETHEREUM ADDRESS
// =============================================================================

/// 20-byte Ethereum account address.
///
/// Rendered as `0x` followed by 40 lowercase hex digits. Ordering is byte-wise,
/// which is what makes `BTreeMap<EthAddress, _>` iteration deterministic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EthAddress(pub [u8; 20]);

impl EthAddress {
    /// Parse from hex, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self, AddressError> {
        decode_fixed::<20>(input).map(Self)
    }

    /// Canonical `0x`-prefixed lowercase rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for EthAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self.to_hex())
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// VALIDATOR NODE ID
// =============================================================================

/// Validator identity: the first 20 bytes of SHA-256 over the ed25519 public
/// key, the same derivation the consensus engine uses for validator addresses.
///
/// Rendered as 40 lowercase hex digits without prefix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    /// Derive the node id for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Sha256::digest(public_key);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        Self(id)
    }

    pub fn from_hex(input: &str) -> Result<Self, AddressError> {
        decode_fixed::<20>(input).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for NodeId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse a 32-byte ed25519 public key from hex.
pub fn public_key_from_hex(input: &str) -> Result<PublicKey, AddressError> {
    decode_fixed::<32>(input)
}
