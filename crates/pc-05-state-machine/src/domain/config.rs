//! # State Machine Configuration

/// What `commit` does when speculative state is more than one round ahead
/// of committed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundDriftPolicy {
    /// Log a warning, synchronise the peg to the latest round and commit.
    #[default]
    Warn,
    /// Refuse the commit: discard the block's effects and return the previous
    /// app hash.
    Strict,
}

impl std::str::FromStr for RoundDriftPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown round drift policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineConfig {
    /// Application version reported by `info`.
    pub version: String,
    pub round_drift_policy: RoundDriftPolicy,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            round_drift_policy: RoundDriftPolicy::Warn,
        }
    }
}
