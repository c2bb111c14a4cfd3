//! # Domain Errors
//!
//! Error types for the transaction coordinator.

use super::value_objects::{AbortReason, GlobalPhase};
use shared_types::{
    CertificateError, ConnectivityError, DependencyMapError, GlobalTxId, Rejection, ShardId,
};
use thiserror::Error;

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    /// No connection handle is registered for the shard.
    #[error("no connection registered for shard {0}")]
    UnknownShard(ShardId),

    /// A transaction must involve at least one shard.
    #[error("a global transaction needs at least one participant")]
    NoParticipants,

    /// The transaction is not (or no longer) tracked.
    #[error("unknown global transaction {0}")]
    UnknownTransaction(GlobalTxId),

    /// The phase cannot be run from the current phase.
    #[error("transaction {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        /// Transaction.
        id: GlobalTxId,
        /// Current phase.
        from: GlobalPhase,
        /// Requested phase.
        to: GlobalPhase,
    },

    /// Abort requested after unanimous PREPARE.
    #[error("transaction {0} passed its commit point; only DECIDE is allowed")]
    CommitPointPassed(GlobalTxId),

    /// The transaction was aborted.
    #[error("transaction {id} aborted: {reason}")]
    TransactionAborted {
        /// Transaction.
        id: GlobalTxId,
        /// Why.
        reason: AbortReason,
    },

    /// DECIDE could not be confirmed on a shard within the retry budget.
    /// The transaction stays prepared; call `decide` again.
    #[error("transaction {id} is in doubt on shard {shard}")]
    InDoubt {
        /// Transaction.
        id: GlobalTxId,
        /// Shard that did not confirm.
        shard: ShardId,
    },

    /// A shard refused a request that cannot be turned into an abort.
    #[error("shard {shard} refused: {rejection}")]
    Rejected {
        /// Refusing shard.
        shard: ShardId,
        /// Shard's answer.
        rejection: Rejection,
    },

    /// A protocol invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Connectivity failure outside a phase call.
    #[error("connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// The dependency map could not be built or read.
    #[error("dependency map: {0}")]
    DependencyMap(#[from] DependencyMapError),

    /// A certificate could not be decoded.
    #[error("certificate: {0}")]
    Certificate(#[from] CertificateError),
}

impl CoordinatorError {
    /// The abort reason, if the error reports an aborted transaction.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            CoordinatorError::TransactionAborted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
