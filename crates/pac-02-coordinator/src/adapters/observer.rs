//! Default observer: progress as tracing events.

use crate::domain::{PhaseReport, ShardReply, TxOutcome};
use crate::ports::CoordinatorObserver;
use shared_types::{GlobalTxId, PacPhase, ShardId};
use tracing::{debug, info, warn};

/// Writes coordinator progress to the tracing subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl CoordinatorObserver for TracingObserver {
    fn phase_started(&self, tx: &GlobalTxId, phase: PacPhase, shards: &[ShardId]) {
        info!("[pac-02] {} {} -> {} shard(s)", tx, phase, shards.len());
    }

    fn shard_responded(
        &self,
        tx: &GlobalTxId,
        phase: PacPhase,
        shard: &ShardId,
        reply: &ShardReply,
    ) {
        match reply {
            ShardReply::Accepted(response) => debug!(
                "[pac-02] {} {} on {}: valid, {} byte payload",
                tx,
                phase,
                shard,
                response.payload.len()
            ),
            ShardReply::AppliedWithoutResponse => info!(
                "[pac-02] {} {} on {}: applied (response lost, confirmed by status)",
                tx, phase, shard
            ),
            ShardReply::Rejected(rejection) => {
                warn!("[pac-02] {} {} on {}: {}", tx, phase, shard, rejection)
            }
            ShardReply::Indeterminate => {
                warn!("[pac-02] {} {} on {}: no answer", tx, phase, shard)
            }
        }
    }

    fn retrying(&self, tx: &GlobalTxId, phase: PacPhase, shard: &ShardId, attempt: u32) {
        warn!(
            "[pac-02] {} {} on {}: re-sending (attempt {})",
            tx, phase, shard, attempt
        );
    }

    fn phase_completed(&self, tx: &GlobalTxId, report: &PhaseReport) {
        info!(
            "[pac-02] {} {} complete on {} shard(s)",
            tx,
            report.phase,
            report.applied.len()
        );
        for (shard, rejection) in &report.tolerated {
            info!(
                "[pac-02] {} {} refused on {} as expected: {}",
                tx, report.phase, shard, rejection.message
            );
        }
    }

    fn outcome(&self, tx: &GlobalTxId, outcome: &TxOutcome) {
        match outcome {
            TxOutcome::Committed => info!("[pac-02] {} COMMITTED", tx),
            TxOutcome::Aborted(reason) => warn!("[pac-02] {} ABORTED: {}", tx, reason),
            TxOutcome::Pending => {}
        }
    }
}
