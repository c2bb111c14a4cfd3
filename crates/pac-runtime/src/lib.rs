//! # PAC Runtime
//!
//! Wires the shard ledgers named in a TOML profile to one coordinator and
//! runs the cross-shard transfer demonstration.
//!
//! ## Modular Structure
//!
//! - `profile/` - TOML profile and environment overrides
//! - `bootstrap/` - one ledger and connection handle per shard
//! - `demo/` - the transfer and abort demonstrations
//!
//! ## Run Sequence
//!
//! 1. Initialise logging (`pac-telemetry`)
//! 2. Load the profile, apply `PAC_*` overrides
//! 3. Bootstrap the shards and the coordinator
//! 4. `InitLedger` on both shards
//! 5. PROPOSE, SPREAD_CERTIFICATES, PREPARE, repeated PREPARE, DECIDE
//! 6. Optionally the abort demonstration
//! 7. Close every connection handle

#![warn(missing_docs)]

pub mod bootstrap;
pub mod demo;
pub mod profile;

pub use bootstrap::{Deployment, ShardHandle};
pub use demo::{init_ledgers, run_abort, run_transfer, AbortSummary, TransferSummary};
pub use profile::{ContractKind, DemoProfile, Profile, ProfileError, ShardProfile};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
