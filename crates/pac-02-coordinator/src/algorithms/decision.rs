//! # Decision Rules
//!
//! How per-shard replies turn into one global decision, and how a status
//! query resolves a reply that never arrived.

use crate::domain::{AbortReason, ShardReply, StatusVerdict};
use shared_types::{PacPhase, Rejection, ShardId, ShardTxStatus};

/// Decide what a shard's status says about a phase whose response was lost.
///
/// | Phase | Applied | Resend | Unresolvable |
/// |-------|---------|--------|--------------|
/// | PROPOSE | - | Unknown | anything else (certificate lost) |
/// | SPREAD | Prepared | Proposed | Unknown, Committed, Aborted |
/// | PREPARE | Prepared | Proposed | Unknown, Committed, Aborted |
/// | DECIDE | Committed | Prepared | Unknown, Proposed, Aborted |
/// | ABORT | Aborted | Unknown, Proposed, Prepared | Committed |
pub fn classify_status(phase: PacPhase, status: ShardTxStatus) -> StatusVerdict {
    use ShardTxStatus::*;
    match (phase, status) {
        (PacPhase::Propose, Unknown) => StatusVerdict::Resend,
        (PacPhase::Propose, _) => StatusVerdict::Unresolvable,

        (PacPhase::SpreadCertificates, Prepared) => StatusVerdict::Applied,
        (PacPhase::SpreadCertificates, Proposed) => StatusVerdict::Resend,
        (PacPhase::SpreadCertificates, _) => StatusVerdict::Unresolvable,

        (PacPhase::Prepare, Prepared) => StatusVerdict::Applied,
        (PacPhase::Prepare, Proposed) => StatusVerdict::Resend,
        (PacPhase::Prepare, _) => StatusVerdict::Unresolvable,

        (PacPhase::Decide, Committed) => StatusVerdict::Applied,
        (PacPhase::Decide, Prepared) => StatusVerdict::Resend,
        (PacPhase::Decide, _) => StatusVerdict::Unresolvable,

        (PacPhase::Abort, Aborted) => StatusVerdict::Applied,
        (PacPhase::Abort, Committed) => StatusVerdict::Unresolvable,
        (PacPhase::Abort, _) => StatusVerdict::Resend,
    }
}

/// Determine whether a phase succeeded everywhere.
///
/// `tolerate` gets a chance to accept a refusal as non-fatal; the first
/// reply that is neither applied nor tolerated becomes the abort reason.
pub fn decide_outcome<'a>(
    phase: PacPhase,
    replies: impl IntoIterator<Item = (&'a ShardId, &'a ShardReply)>,
    tolerate: impl Fn(&ShardId, &Rejection) -> bool,
) -> Result<(), AbortReason> {
    for (shard, reply) in replies {
        match reply {
            ShardReply::Accepted(_) | ShardReply::AppliedWithoutResponse => {}
            ShardReply::Rejected(rejection) if tolerate(shard, rejection) => {}
            ShardReply::Rejected(rejection) => {
                return Err(AbortReason::Rejected {
                    shard: shard.clone(),
                    phase,
                    kind: rejection.kind,
                    message: rejection.message.clone(),
                });
            }
            ShardReply::Indeterminate => {
                return Err(AbortReason::Indeterminate {
                    shard: shard.clone(),
                    phase,
                });
            }
        }
    }
    Ok(())
}
