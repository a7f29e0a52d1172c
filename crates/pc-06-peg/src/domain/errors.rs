use pc_02_signer::SignerError;
use thiserror::Error;

/// Errors inside the peg reactor.
#[derive(Debug, Error)]
pub enum PegError {
    /// Provider request failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The subscription reported an error.
    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Subscription closed")]
    SubscriptionClosed,

    /// A contract log could not be decoded into a stake event.
    #[error("Malformed stake log: {0}")]
    MalformedLog(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Payload encoding failed: {0}")]
    Payload(String),

    /// The broadcaster queue is gone; nothing more can be proposed.
    #[error("Broadcaster closed")]
    BroadcasterClosed,
}

impl PegError {
    /// Errors that end the reactor instead of triggering a reconnect.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PegError::BroadcasterClosed | PegError::Signing(_) | PegError::Payload(_))
    }
}

/// Errors submitting to the local ABCI endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The consensus engine cannot be reached. Fatal to the broadcaster.
    #[error("Connection to consensus engine failed: {0}")]
    Connection(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}
