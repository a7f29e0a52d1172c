//! # Order Object
//!
//! The parts of an order the state machine reads. Everything else in the
//! payload is carried through untouched to subscribers.
//!
//! ## Poster Signature (secp256k1)
//!
//! ```text
//! poster_hash = keccak256(canonical_json({makerValues, subContract}))
//! digest      = keccak256("\x19Ethereum Signed Message:\n32" || poster_hash)
//! poster      = ecrecover(digest, posterSignature{v, r, s})
//! ```
//!
//! ## Order Id
//!
//! `0x` + hex of `keccak256(canonical_json({makerValues, posterSignature,
//! subContract}))`. Volatile fields (taker arguments, timestamps added by
//! relayers) do not affect the id.

use super::errors::OrderError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha3::{Digest, Keccak256};
use shared_types::{canonical_bytes, EthAddress, Hash};

const PERSONAL_SIGN_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Recoverable secp256k1 signature by the poster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterSignature {
    /// Recovery id: 0, 1, 27 or 28.
    pub v: u8,
    /// `0x`-prefixed 32-byte hex.
    pub r: String,
    /// `0x`-prefixed 32-byte hex.
    pub s: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderFields {
    sub_contract: String,
    #[serde(default)]
    maker_values: Map<String, Value>,
    poster_signature: PosterSignature,
}

/// A parsed order.
#[derive(Debug, Clone)]
pub struct Order {
    raw: Value,
    sub_contract: String,
    maker_values: Map<String, Value>,
    poster_signature: PosterSignature,
}

impl Order {
    /// Build an order from a transaction payload.
    pub fn from_value(data: &Value) -> Result<Self, OrderError> {
        let fields: OrderFields = serde_json::from_value(data.clone())
            .map_err(|e| OrderError::Invalid(e.to_string()))?;
        if fields.sub_contract.is_empty() {
            return Err(OrderError::Invalid("empty subContract".into()));
        }
        Ok(Self {
            raw: data.clone(),
            sub_contract: fields.sub_contract,
            maker_values: fields.maker_values,
            poster_signature: fields.poster_signature,
        })
    }

    pub fn sub_contract(&self) -> &str {
        &self.sub_contract
    }

    /// Size of the canonical serialization, in bytes.
    pub fn size(&self) -> usize {
        canonical_bytes(&self.raw).len()
    }

    /// Recover the poster address from the embedded signature.
    pub fn recover_poster(&self) -> Result<EthAddress, OrderError> {
        let digest = personal_digest(&poster_hash(&self.sub_contract, &self.maker_values));
        recover_address(&digest, &self.poster_signature)
    }

    /// Content id, stable across relays.
    pub fn id(&self) -> String {
        let preimage = json!({
            "makerValues": self.maker_values,
            "posterSignature": self.poster_signature,
            "subContract": self.sub_contract,
        });
        format!("0x{}", hex::encode(keccak256(&canonical_bytes(&preimage))))
    }

    /// The order as submitted.
    pub fn to_json(&self) -> &Value {
        &self.raw
    }
}

/// Build a signed order payload on behalf of a poster.
pub fn sign_order(
    sub_contract: &str,
    maker_values: Map<String, Value>,
    poster_key: &SigningKey,
) -> Result<Value, OrderError> {
    let digest = personal_digest(&poster_hash(sub_contract, &maker_values));
    let (signature, recovery_id) = poster_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| OrderError::Signature(e.to_string()))?;
    let bytes = signature.to_bytes();
    let poster_signature = PosterSignature {
        v: recovery_id.to_byte() + 27,
        r: format!("0x{}", hex::encode(&bytes[..32])),
        s: format!("0x{}", hex::encode(&bytes[32..])),
    };

    Ok(json!({
        "subContract": sub_contract,
        "makerValues": maker_values,
        "posterSignature": poster_signature,
    }))
}

/// Ethereum address of a secp256k1 public key.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> EthAddress {
    let encoded = public_key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag.
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    EthAddress(address)
}

fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

fn poster_hash(sub_contract: &str, maker_values: &Map<String, Value>) -> Hash {
    let preimage = json!({
        "makerValues": maker_values,
        "subContract": sub_contract,
    });
    keccak256(&canonical_bytes(&preimage))
}

fn personal_digest(hash: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_SIGN_PREFIX);
    hasher.update(hash);
    hasher.finalize().into()
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, OrderError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(OrderError::Signature(format!("invalid recovery id {v}"))),
    };
    RecoveryId::try_from(id).map_err(|_| OrderError::Signature(format!("invalid recovery id {v}")))
}

fn decode_scalar(input: &str, field: &str) -> Result<[u8; 32], OrderError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(digits)
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .ok_or_else(|| OrderError::Signature(format!("{field} is not 32-byte hex")))
}

fn recover_address(digest: &Hash, signature: &PosterSignature) -> Result<EthAddress, OrderError> {
    let recovery_id = parse_recovery_id(signature.v)?;

    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&decode_scalar(&signature.r, "r")?);
    bytes[32..].copy_from_slice(&decode_scalar(&signature.s, "s")?);
    let sig = Signature::from_slice(&bytes).map_err(|e| OrderError::Signature(e.to_string()))?;

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| OrderError::Signature("public key recovery failed".into()))?;
    Ok(address_from_pubkey(&key))
}


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_recover_poster() {
        let key = poster_key(3);
        let order = Order::from_value(&signed_order(&key, 1)).unwrap();
        assert_eq!(order.recover_poster().unwrap(), poster_address(&key));
    }

    #[test]
    fn test_tampered_maker_values_recover_other_address() {
        let key = poster_key(3);
        let mut data = signed_order(&key, 1);
        data["makerValues"]["nonce"] = json!(2);
        let order = Order::from_value(&data).unwrap();
        let recovered = order.recover_poster();
        assert!(recovered.map_or(true, |a| a != poster_address(&key)));
    }

    #[test]
    fn test_id_ignores_volatile_fields() {
        let key = poster_key(5);
        let data = signed_order(&key, 1);
        let mut relayed = data.clone();
        relayed["takerArguments"] = json!(["x"]);

        let a = Order::from_value(&data).unwrap();
        let b = Order::from_value(&relayed).unwrap();
        assert_eq!(a.id(), b.id());
        assert!(a.id().starts_with("0x"));
        assert_eq!(a.id().len(), 66);
        assert!(b.size() > a.size());

        let other = Order::from_value(&signed_order(&key, 2)).unwrap();
        assert_ne!(a.id(), other.id());
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            Order::from_value(&json!({"subContract": "0x1"})),
            Err(OrderError::Invalid(_))
        ));
        assert!(Order::from_value(&json!("order")).is_err());
    }

    #[test]
    fn test_bad_signature_encoding() {
        let mut data = signed_order(&poster_key(1), 1);
        data["posterSignature"]["r"] = json!("0x1234");
        let order = Order::from_value(&data).unwrap();
        assert!(matches!(order.recover_poster(), Err(OrderError::Signature(_))));

        let mut data = signed_order(&poster_key(1), 1);
        data["posterSignature"]["v"] = json!(5);
        let order = Order::from_value(&data).unwrap();
        assert!(matches!(order.recover_poster(), Err(OrderError::Signature(_))));
    }
}
