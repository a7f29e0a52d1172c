//! # Arbitrary-Precision Integer Encoding
//!
//! Stake amounts and balances are `U256`. On the wire they are rendered as a
//! JSON string of decimal digits followed by an `n` suffix (`"500n"`), which
//! keeps them distinguishable from ordinary numbers and lets them round-trip
//! exactly.
//!
//! Use with `#[serde(with = "shared_types::bigint")]`. Deserialization also
//! accepts a plain decimal string (`"500"`) or a JSON integer (`500`).

use crate::errors::BigIntError;
use primitive_types::U256;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Suffix marking a big-integer string.
pub const BIGINT_SUFFIX: char = 'n';

/// Render a value in wire form (`"<digits>n"`).
pub fn render(value: &U256) -> String {
    format!("{value}{BIGINT_SUFFIX}")
}

/// Parse a decimal literal, with or without the `n` suffix.
pub fn parse(literal: &str) -> Result<U256, BigIntError> {
    let digits = literal.strip_suffix(BIGINT_SUFFIX).unwrap_or(literal);
    if digits.is_empty() {
        return Err(BigIntError::Empty);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BigIntError::InvalidDigits(literal.to_string()));
    }
    U256::from_dec_str(digits).map_err(|_| BigIntError::Overflow(literal.to_string()))
}

pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&render(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    deserializer.deserialize_any(BigIntVisitor)
}

struct BigIntVisitor;

impl<'de> Visitor<'de> for BigIntVisitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal integer literal, optionally suffixed with 'n'")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative integer {v}")))
    }
}
