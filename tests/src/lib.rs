//! # Poster-Chain Test Suite
//!
//! Cross-crate scenarios that exercise the state machine, handlers and peg
//! together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # keys, machines, transaction builders
//! └── integration/
//!     ├── scenarios.rs   # ledger scenarios through the ABCI surface
//!     ├── determinism.rs # replicas agree on app hashes
//!     └── peg_pipeline.rs# Ethereum events → peg → mempool → blocks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pc-tests
//! cargo test -p pc-tests integration::peg_pipeline::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
