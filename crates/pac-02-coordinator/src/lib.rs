//! # PAC-02 Transaction Coordinator
//!
//! Runs one atomic commit across shards that never talk to each other.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! A global transaction is one business operation per participating shard.
//! The coordinator sends each phase to every participant, waits for all of
//! them, and folds the replies into a single decision:
//!
//! ```text
//! PROPOSED ──► CERTIFIED ──► CERTIFICATES_SPREAD ──► PREPARED ──► COMMITTED
//!     │            │                 │
//!     └────────────┴─────────────────┴──► ABORTED
//! ```
//!
//! COMMIT requires every shard to accept PREPARE. Any earlier refusal sends
//! ABORT to every shard that may hold locks. Past PREPARED the only way out
//! is DECIDE.
//!
//! ## Module Structure
//!
//! ```text
//! pac-02-coordinator/
//! ├── domain/          # GlobalTransaction, phases, outcomes, CoordinatorConfig
//! ├── algorithms/      # decide_outcome, classify_status
//! ├── ports/           # CoordinatorApi (inbound), observer and log (outbound)
//! ├── adapters/        # ShardClient, TracingObserver, InMemoryTransactionLog
//! └── service.rs       # Coordinator
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryTransactionLog, ShardClient, TracingObserver};
pub use algorithms::{classify_status, decide_outcome};
pub use domain::{
    AbortReason, CoordinatorConfig, CoordinatorError, GlobalPhase, GlobalTransaction,
    PhaseReport, ShardOperation, ShardProgress, ShardReply, ShardStage, StatusVerdict, TxOutcome,
};
pub use ports::{CoordinatorApi, CoordinatorObserver, LogEntry, LogEvent, TransactionLog};
pub use service::Coordinator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
