pub mod order;
pub mod rebalance;
pub mod witness;
