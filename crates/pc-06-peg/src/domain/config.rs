use std::time::Duration;

/// Peg parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegConfig {
    /// Ethereum confirmations before an event is reported.
    pub finality_threshold: u64,
    /// Round length in Ethereum blocks.
    pub period_length: u64,
    /// Total order quota proposed for each round.
    pub period_limit: u64,
    /// First reconnect delay.
    pub reconnect_base: Duration,
    /// Reconnect delay cap.
    pub reconnect_max: Duration,
}

impl Default for PegConfig {
    fn default() -> Self {
        Self {
            finality_threshold: 12,
            period_length: 25,
            period_limit: 1000,
            reconnect_base: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(30),
        }
    }
}
