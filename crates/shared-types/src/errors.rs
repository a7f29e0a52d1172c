//! # Error Types
//!
//! Parse errors for the shared wire types.

use thiserror::Error;

/// Errors produced while parsing an address or node id from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The input is not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded byte length is wrong.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors produced while parsing an arbitrary-precision integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BigIntError {
    /// Empty input.
    #[error("Empty integer literal")]
    Empty,

    /// The literal contains something other than decimal digits.
    #[error("Invalid integer literal: {0}")]
    InvalidDigits(String),

    /// The value does not fit in 256 bits.
    #[error("Integer literal overflows 256 bits: {0}")]
    Overflow(String),
}

/// Unknown `type` tag on a transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown transaction type: {0}")]
pub struct UnknownTxType(pub String);
