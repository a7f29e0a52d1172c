pub mod abci;
pub mod config;
pub mod errors;
