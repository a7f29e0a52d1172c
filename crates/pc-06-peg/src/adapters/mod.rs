pub mod alloy_provider;
pub mod channel_provider;
