pub mod broadcaster;
pub mod peg;
pub mod tx_generator;
