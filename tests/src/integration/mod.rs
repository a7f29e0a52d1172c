//! Cross-crate integration tests.

mod determinism;
mod peg_pipeline;
mod scenarios;
