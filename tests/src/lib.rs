//! # PAC Ledger Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Two-shard deployments shared by every test
//! ├── integration/      # Coordinator + shard ledgers end to end
//! │   ├── scenario.rs   # The transfer scenario, commit and abort
//! │   ├── properties.rs # Exclusion, idempotent abort, certificates, balances
//! │   └── indeterminate.rs # Lost requests and lost responses
//! └── exploits/         # A misbehaving driver talking to a shard directly
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pac-tests
//!
//! # By category
//! cargo test -p pac-tests integration::
//! cargo test -p pac-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p pac-tests
//! ```

#![allow(dead_code)]

pub mod exploits;
pub mod fixtures;
pub mod integration;
