//! End-to-end integration tests across all meross-core crates.
//!
//! This crate has no runtime code of its own; see `tests/`.
