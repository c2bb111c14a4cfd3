//! # PAC-01 Shard Ledger Contract
//!
//! Lock-aware key-value ledger for one shard, with PAC certificates.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Each shard hosts one deterministic business contract (assets or
//! accounts) and knows nothing about the other shards. The ledger runs that
//! contract in two ways:
//!
//! - **Plain**: execute and commit at once, unless a written key is locked.
//! - **PAC**: take part in a cross-shard atomic commit, phase by phase.
//!
//! ## PAC on a shard
//!
//! | Phase | What the shard does |
//! |-------|---------------------|
//! | PROPOSE | simulate, lock every key read or written, return a `HashPair` and a local tx id |
//! | SPREAD_CERTIFICATES | check its own certificate in the map, store peers' |
//! | PREPARE | re-simulate, recompute the certificate, compare, mark prepared |
//! | DECIDE | apply the buffered write set, bump versions, release locks |
//! | ABORT | drop the buffered write set, release locks (idempotent) |
//!
//! ## Module Structure
//!
//! ```text
//! pac-01-shard-contract/
//! ├── domain/          # Asset, Account, WorldState, RwSet, ContractError
//! ├── algorithms/      # TxSimulator, certificate digests, LockTable
//! ├── ports/           # ShardLedgerApi (inbound), Contract (outbound)
//! ├── adapters/        # AssetContract, AccountContract, InProcessShardConnection
//! └── service.rs       # ShardLedger
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{AccountContract, AssetContract, InProcessShardConnection};
pub use algorithms::{compute_certificate, LockTable, TxSimulator};
pub use domain::{
    invariant_lock_exclusive, invariant_non_negative_balance, Account, Asset, ContractError,
    PacStage, PendingTransaction, PhaseOutcome, ProposalReceipt, RwSet, VersionedValue,
    WorldState,
};
pub use ports::{Contract, ShardLedgerApi};
pub use service::ShardLedger;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
