//! Integration test crate for fanout.
//!
//! This crate has no library code. It only contains integration tests
//! that drive whole distributions across the workspace crates against the
//! in-memory stub ledger, with tokio's paused clock standing in for the
//! inter-batch and scheduler delays.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p fanout-integration-tests
//! ```
