//! # Algorithms Module
//!
//! Simulation, certificate computation and key locking.

pub mod certificate;
pub mod locks;
pub mod simulator;

pub use certificate::{compute_certificate, read_set_digest, write_set_digest};
pub use locks::LockTable;
pub use simulator::TxSimulator;
