//! # Algorithms Module
//!
//! Decision rules of the coordinator.

pub mod decision;

pub use decision::{classify_status, decide_outcome};
