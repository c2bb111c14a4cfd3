//! # Integration Tests
//!
//! The coordinator driving real shard ledgers through in-process
//! connections.

pub mod indeterminate;
pub mod properties;
pub mod scenario;
