//! # Domain Value Objects
//!
//! Phases, outcomes and per-shard replies of a global transaction.

use serde::{Deserialize, Serialize};
use shared_types::{InvokeResponse, PacPhase, Rejection, RejectionKind, ShardId};
use std::fmt;

/// Coordinator-side phase of a global transaction.
///
/// ```text
/// Proposed -> Certified -> CertificatesSpread -> Prepared -> Committed
///     \           \               \
///      +-----------+---------------+--> Aborted
/// ```
///
/// `Prepared` is the commit point: from there the only way out is
/// `Committed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalPhase {
    /// Created; PROPOSE not yet accepted everywhere.
    Proposed,
    /// Every shard returned a certificate.
    Certified,
    /// Every shard accepted the certificate set.
    CertificatesSpread,
    /// Every shard prepared. Commit point.
    Prepared,
    /// Every shard applied the write.
    Committed,
    /// Every lock holder released its locks.
    Aborted,
}

impl GlobalPhase {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: GlobalPhase) -> bool {
        matches!(
            (self, next),
            (GlobalPhase::Proposed, GlobalPhase::Certified)
                | (GlobalPhase::Proposed, GlobalPhase::Aborted)
                | (GlobalPhase::Certified, GlobalPhase::CertificatesSpread)
                | (GlobalPhase::Certified, GlobalPhase::Aborted)
                | (GlobalPhase::CertificatesSpread, GlobalPhase::Prepared)
                | (GlobalPhase::CertificatesSpread, GlobalPhase::Aborted)
                | (GlobalPhase::Prepared, GlobalPhase::Committed)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(&self) -> bool {
        matches!(self, GlobalPhase::Committed | GlobalPhase::Aborted)
    }

    /// Has unanimous PREPARE been reached?
    pub fn past_commit_point(&self) -> bool {
        matches!(self, GlobalPhase::Prepared | GlobalPhase::Committed)
    }
}

impl fmt::Display for GlobalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GlobalPhase::Proposed => "PROPOSED",
            GlobalPhase::Certified => "CERTIFIED",
            GlobalPhase::CertificatesSpread => "CERTIFICATES_SPREAD",
            GlobalPhase::Prepared => "PREPARED",
            GlobalPhase::Committed => "COMMITTED",
            GlobalPhase::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Progress of one shard, as far as the coordinator knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShardStage {
    /// Nothing sent yet.
    #[default]
    Pending,
    /// PROPOSE sent, outcome not known. The shard may hold locks.
    Uncertain,
    /// PROPOSE accepted; locks held.
    Proposed,
    /// Certificate set accepted.
    CertificatesSpread,
    /// PREPARE accepted.
    Prepared,
    /// DECIDE applied.
    Decided,
    /// ABORT applied.
    Aborted,
}

impl ShardStage {
    /// Might the shard hold locks for the transaction?
    pub fn may_hold_locks(&self) -> bool {
        matches!(
            self,
            ShardStage::Uncertain
                | ShardStage::Proposed
                | ShardStage::CertificatesSpread
                | ShardStage::Prepared
        )
    }
}

/// The business operation one shard executes for a global transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardOperation {
    /// Target shard.
    pub shard: ShardId,
    /// Contract operation, e.g. `TransferAsset`.
    pub operation: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl ShardOperation {
    /// Build an operation.
    pub fn new(
        shard: impl Into<ShardId>,
        operation: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            shard: shard.into(),
            operation: operation.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reason for aborting a global transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// A shard refused a phase.
    Rejected {
        /// Refusing shard.
        shard: ShardId,
        /// Phase refused.
        phase: PacPhase,
        /// Category.
        kind: RejectionKind,
        /// Shard's message.
        message: String,
    },
    /// A shard's outcome could not be established within the retry budget.
    Indeterminate {
        /// Shard.
        shard: ShardId,
        /// Phase.
        phase: PacPhase,
    },
    /// A shard answered with something the protocol does not allow.
    Protocol {
        /// Shard.
        shard: ShardId,
        /// Phase.
        phase: PacPhase,
        /// What was wrong.
        detail: String,
    },
    /// The driver called `abort`.
    Cancelled,
}

impl AbortReason {
    /// Shard blamed for the abort, if any.
    pub fn shard(&self) -> Option<&ShardId> {
        match self {
            AbortReason::Rejected { shard, .. }
            | AbortReason::Indeterminate { shard, .. }
            | AbortReason::Protocol { shard, .. } => Some(shard),
            AbortReason::Cancelled => None,
        }
    }

    /// Could the same transaction succeed if retried later?
    pub fn is_retryable(&self) -> bool {
        match self {
            AbortReason::Rejected { kind, .. } => kind.is_retryable(),
            AbortReason::Indeterminate { .. } => true,
            AbortReason::Protocol { .. } | AbortReason::Cancelled => false,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Rejected {
                shard,
                phase,
                kind,
                message,
            } => write!(f, "{shard} refused {phase} ({kind}): {message}"),
            AbortReason::Indeterminate { shard, phase } => {
                write!(f, "{shard} did not answer {phase}")
            }
            AbortReason::Protocol {
                shard,
                phase,
                detail,
            } => write!(f, "{shard} sent an invalid {phase} response: {detail}"),
            AbortReason::Cancelled => f.write_str("cancelled by the driver"),
        }
    }
}

/// Outcome of a global transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TxOutcome {
    /// Not decided yet.
    #[default]
    Pending,
    /// Applied on every shard.
    Committed,
    /// Applied nowhere.
    Aborted(AbortReason),
}

impl TxOutcome {
    /// Has a decision been taken?
    pub fn is_decided(&self) -> bool {
        !matches!(self, TxOutcome::Pending)
    }
}

/// One shard's answer to one phase call, after indeterminate results have
/// been resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShardReply {
    /// The shard accepted the request.
    Accepted(InvokeResponse),
    /// The response was lost, but a status query shows the phase took effect.
    AppliedWithoutResponse,
    /// The shard refused the request.
    Rejected(Rejection),
    /// Retries ran out without establishing what happened.
    Indeterminate,
}

impl ShardReply {
    /// Did the phase take effect on the shard?
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            ShardReply::Accepted(_) | ShardReply::AppliedWithoutResponse
        )
    }
}

/// What a status query says about a phase whose response was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusVerdict {
    /// The phase took effect.
    Applied,
    /// The phase did not take effect and may be sent again.
    Resend,
    /// The shard is in a state the phase cannot recover from.
    Unresolvable,
}

/// Summary of one completed phase call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    /// Phase.
    pub phase: PacPhase,
    /// Shards on which the phase took effect.
    pub applied: Vec<ShardId>,
    /// Refusals the coordinator tolerated (e.g. a repeated PREPARE).
    pub tolerated: Vec<(ShardId, Rejection)>,
}

impl PhaseReport {
    /// Empty report for `phase`.
    pub fn new(phase: PacPhase) -> Self {
        Self {
            phase,
            applied: Vec::new(),
            tolerated: Vec::new(),
        }
    }
}
