//! # Domain Errors
//!
//! Error types for the shard ledger contract.

use rust_decimal::Decimal;
use shared_types::{
    DependencyMapError, GlobalTxId, HashPair, LocalTxId, PacPhase, Rejection, RejectionKind,
    ShardId, ShardTxStatus,
};
use thiserror::Error;

/// Shard ledger contract errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    /// Key does not exist in the world state.
    #[error("the {kind} {id} does not exist")]
    NotFound {
        /// Object kind (asset, account).
        kind: &'static str,
        /// Key.
        id: String,
    },

    /// Key already exists.
    #[error("the {kind} {id} already exists")]
    AlreadyExists {
        /// Object kind (asset, account).
        kind: &'static str,
        /// Key.
        id: String,
    },

    /// A balance would go below zero.
    #[error("the balance of {id} is too small: {balance} < {requested}")]
    InsufficientBalance {
        /// Account key.
        id: String,
        /// Current balance.
        balance: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// A balance argument is negative.
    #[error("negative balance {balance} for {id}")]
    NegativeBalance {
        /// Account key.
        id: String,
        /// Offending value.
        balance: Decimal,
    },

    /// Malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Wrong number of arguments.
    #[error("{operation} expects {expected} arguments, got {got}")]
    ArgumentCount {
        /// Operation name.
        operation: String,
        /// Required count.
        expected: usize,
        /// Received count.
        got: usize,
    },

    /// The contract does not implement the operation.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Stored JSON does not decode.
    #[error("corrupt world state entry {key}: {reason}")]
    CorruptState {
        /// Key.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// A key the request would write is locked by another transaction.
    #[error("key {key} is locked by transaction {holder}")]
    LockConflict {
        /// Locked key.
        key: String,
        /// Transaction holding the lock.
        holder: GlobalTxId,
    },

    /// Recomputed certificate differs from the one issued at PROPOSE.
    #[error("certificate mismatch: issued {issued}, recomputed {recomputed}")]
    CertificateMismatch {
        /// Issued at PROPOSE.
        issued: HashPair,
        /// Recomputed now.
        recomputed: HashPair,
    },

    /// Certificate carried in the dependency map is not the one issued.
    #[error("dependency map carries certificate {carried} for {shard}, issued {issued}")]
    ForeignCertificate {
        /// This shard.
        shard: ShardId,
        /// Issued at PROPOSE.
        issued: HashPair,
        /// Found in the map.
        carried: HashPair,
    },

    /// A participant has no certificate in the dependency map.
    #[error("dependency map has no certificate for participant {0}")]
    MissingCertificate(ShardId),

    /// A key read at PROPOSE changed before DECIDE.
    #[error("key {key} changed since it was read (version {read:?} -> {current:?})")]
    StateDrift {
        /// Key.
        key: String,
        /// Version at PROPOSE.
        read: Option<u64>,
        /// Version now.
        current: Option<u64>,
    },

    /// PREPARE repeated for an already-prepared transaction.
    #[error("transaction {0} is already prepared")]
    AlreadyPrepared(GlobalTxId),

    /// PROPOSE repeated for a transaction this shard already knows.
    #[error("transaction {0} was already proposed on this shard")]
    DuplicateProposal(GlobalTxId),

    /// No record of the transaction.
    #[error("unknown transaction {0}")]
    UnknownTransaction(GlobalTxId),

    /// Local tx id in the dependency map is not the one issued.
    #[error("local transaction id mismatch: issued {issued}, got {got:?}")]
    LocalTxIdMismatch {
        /// Issued at PROPOSE.
        issued: LocalTxId,
        /// Received.
        got: Option<LocalTxId>,
    },

    /// The operation differs from the one proposed.
    #[error("transaction {tx} was proposed as {proposed}, got {got}")]
    OperationMismatch {
        /// Transaction.
        tx: GlobalTxId,
        /// Proposed operation.
        proposed: String,
        /// Requested operation.
        got: String,
    },

    /// Phase arrived out of order.
    #[error("{phase} not allowed for transaction {tx} in state {status:?}")]
    PhaseOrder {
        /// Transaction.
        tx: GlobalTxId,
        /// Requested phase.
        phase: PacPhase,
        /// Current shard-side status.
        status: ShardTxStatus,
    },

    /// The transaction was already decided the other way.
    #[error("transaction {tx} is already {status:?}")]
    DecisionConflict {
        /// Transaction.
        tx: GlobalTxId,
        /// Terminal status.
        status: ShardTxStatus,
    },

    /// This shard is not listed in the dependency map.
    #[error("shard {0} is not a participant of the transaction")]
    NotParticipant(ShardId),

    /// The operation scans a key range, which key locks cannot cover.
    #[error("{0} scans a key range and cannot take part in a PAC transaction")]
    RangeRead(String),

    /// PAC request without a dependency map.
    #[error("PAC request without dependency map")]
    MissingDependencyMap,

    /// Dependency map is malformed.
    #[error("dependency map: {0}")]
    DependencyMap(#[from] DependencyMapError),
}

impl ContractError {
    /// Category reported to the coordinator.
    pub fn rejection_kind(&self) -> RejectionKind {
        match self {
            Self::LockConflict { .. } => RejectionKind::LockConflict,
            Self::CertificateMismatch { .. }
            | Self::ForeignCertificate { .. }
            | Self::MissingCertificate(_)
            | Self::StateDrift { .. } => RejectionKind::CertificateMismatch,
            Self::AlreadyPrepared(_) => RejectionKind::AlreadyPrepared,
            Self::UnknownTransaction(_) | Self::LocalTxIdMismatch { .. } => {
                RejectionKind::UnknownTransaction
            }
            Self::PhaseOrder { .. } | Self::DuplicateProposal(_) => RejectionKind::PhaseOrder,
            Self::DecisionConflict { .. } => RejectionKind::DecisionConflict,
            _ => RejectionKind::Validation,
        }
    }

    /// Wire form of the error.
    pub fn to_rejection(&self) -> Rejection {
        Rejection::new(self.rejection_kind(), self.to_string())
    }
}
