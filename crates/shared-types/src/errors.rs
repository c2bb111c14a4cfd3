//! # Error Types
//!
//! Errors and rejection categories that cross the coordinator / shard
//! boundary.

use crate::entities::ShardId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a shard refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    /// Business validation failed (missing key, insufficient balance,
    /// malformed input). Never retried.
    Validation,
    /// A key is locked by another in-flight transaction. No state was
    /// mutated; the whole transaction may be retried later.
    LockConflict,
    /// Recomputed or exchanged certificate does not match.
    CertificateMismatch,
    /// PREPARE repeated for an already-prepared transaction.
    AlreadyPrepared,
    /// The shard has no record of the transaction, or the local tx id does
    /// not match the one it issued.
    UnknownTransaction,
    /// The phase arrived out of order (e.g. PREPARE before SPREAD).
    PhaseOrder,
    /// The transaction was already decided the other way.
    DecisionConflict,
}

impl RejectionKind {
    /// May the caller retry the whole global transaction later?
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockConflict)
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::LockConflict => "lock conflict",
            Self::CertificateMismatch => "certificate mismatch",
            Self::AlreadyPrepared => "already prepared",
            Self::UnknownTransaction => "unknown transaction",
            Self::PhaseOrder => "phase order",
            Self::DecisionConflict => "decision conflict",
        };
        f.write_str(name)
    }
}

/// A shard's refusal, as carried in an invocation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct Rejection {
    /// Category of the refusal.
    pub kind: RejectionKind,
    /// Human-readable detail from the shard.
    pub message: String,
}

impl Rejection {
    /// Create a rejection.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Transport-level failure talking to a shard.
///
/// The outcome of the request is unknown: it may or may not have been
/// applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    /// The handle does not serve this shard.
    #[error("No connection to shard {0}")]
    UnknownShard(ShardId),

    /// The shard did not answer.
    #[error("Shard {shard} unavailable: {reason}")]
    Unavailable {
        /// Shard that failed.
        shard: ShardId,
        /// Transport detail.
        reason: String,
    },

    /// The connection was closed by its owner.
    #[error("Connection to shard {0} is closed")]
    Closed(ShardId),
}

impl ConnectivityError {
    /// Shard the error refers to.
    pub fn shard(&self) -> &ShardId {
        match self {
            Self::UnknownShard(shard) | Self::Closed(shard) => shard,
            Self::Unavailable { shard, .. } => shard,
        }
    }
}

/// Malformed certificate bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    /// Wrong encoded length.
    #[error("Certificate must be {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },

    /// Text form is not valid base64.
    #[error("Certificate is not valid base64: {0}")]
    InvalidBase64(String),
}

/// Malformed or incomplete dependency map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyMapError {
    /// A reserved key is absent.
    #[error("Dependency map is missing key '{0}'")]
    MissingKey(String),

    /// A reserved key holds non-UTF-8 bytes.
    #[error("Dependency map key '{0}' is not valid UTF-8")]
    InvalidUtf8(String),

    /// The global transaction id does not parse.
    #[error("Dependency map carries an invalid global transaction id: {0}")]
    InvalidGlobalId(String),

    /// A certificate entry does not decode.
    #[error("Dependency map certificate for {shard} is malformed: {source}")]
    InvalidCertificate {
        /// Shard whose entry is malformed.
        shard: ShardId,
        /// Decoding error.
        source: CertificateError,
    },

    /// The shard is not listed as a participant.
    #[error("Shard {0} is not a participant of this transaction")]
    UnknownParticipant(ShardId),

    /// The same shard is listed twice.
    #[error("Shard {0} is listed twice")]
    DuplicateParticipant(ShardId),

    /// Business metadata tried to overwrite a protocol key.
    #[error("Key '{0}' is reserved by the protocol")]
    ReservedKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::new(RejectionKind::LockConflict, "asset4 is locked");
        assert_eq!(rejection.to_string(), "lock conflict: asset4 is locked");
    }

    #[test]
    fn test_only_lock_conflicts_are_retryable() {
        assert!(RejectionKind::LockConflict.is_retryable());
        assert!(!RejectionKind::Validation.is_retryable());
        assert!(!RejectionKind::CertificateMismatch.is_retryable());
    }

    #[test]
    fn test_connectivity_error_shard() {
        let err = ConnectivityError::Unavailable {
            shard: ShardId::from("mychannel2"),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.shard().as_str(), "mychannel2");
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_certificate_error_display() {
        let err = CertificateError::InvalidLength {
            expected: 64,
            got: 3,
        };
        assert!(err.to_string().contains("64"));
    }
}
