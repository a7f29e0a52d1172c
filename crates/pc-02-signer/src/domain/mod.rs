//! # Domain Layer
//!
//! Pure signing logic with no I/O dependencies.

pub mod errors;
pub mod keys;
pub mod shape;
pub mod verify;
