//! # Outbound Ports
//!
//! Progress observation and the durable record of decisions.
//! Shard connectivity itself is the [`shared_types::ShardInvoker`] port.

use crate::domain::{GlobalPhase, PhaseReport, ShardReply, TxOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{GlobalTxId, PacPhase, ShardId};

/// Observer of coordinator progress.
///
/// Every method has an empty default so observers implement only what they
/// render.
pub trait CoordinatorObserver: Send + Sync {
    /// A phase is about to be dispatched to `shards`.
    fn phase_started(&self, _tx: &GlobalTxId, _phase: PacPhase, _shards: &[ShardId]) {}

    /// One shard answered (after indeterminate results were resolved).
    fn shard_responded(
        &self,
        _tx: &GlobalTxId,
        _phase: PacPhase,
        _shard: &ShardId,
        _reply: &ShardReply,
    ) {
    }

    /// A phase call is about to be re-sent after a connectivity error.
    fn retrying(&self, _tx: &GlobalTxId, _phase: PacPhase, _shard: &ShardId, _attempt: u32) {}

    /// Every shard answered and the phase succeeded.
    fn phase_completed(&self, _tx: &GlobalTxId, _report: &PhaseReport) {}

    /// The transaction reached a decision.
    fn outcome(&self, _tx: &GlobalTxId, _outcome: &TxOutcome) {}
}

/// What happened to a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEvent {
    /// Transaction created.
    Begun {
        /// Label.
        label: String,
        /// Participants.
        participants: Vec<ShardId>,
    },
    /// Coordinator-side phase changed.
    PhaseReached(GlobalPhase),
    /// Final decision.
    Decided(TxOutcome),
}

/// One transaction log record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Transaction.
    pub tx_id: GlobalTxId,
    /// Event.
    pub event: LogEvent,
    /// When it was recorded.
    pub at: DateTime<Utc>,
}

impl LogEntry {
    /// Record `event` now.
    pub fn now(tx_id: GlobalTxId, event: LogEvent) -> Self {
        Self {
            tx_id,
            event,
            at: Utc::now(),
        }
    }
}

/// Append-only record of phase transitions and decisions, from which an
/// external reconciliation pass can re-derive every outcome.
pub trait TransactionLog: Send + Sync {
    /// Append an entry.
    fn record(&self, entry: LogEntry);

    /// Entries of one transaction, oldest first.
    fn entries(&self, tx: &GlobalTxId) -> Vec<LogEntry>;

    /// The recorded decision, if any.
    fn decision(&self, tx: &GlobalTxId) -> Option<TxOutcome> {
        self.entries(tx).into_iter().rev().find_map(|entry| match entry.event {
            LogEvent::Decided(outcome) => Some(outcome),
            _ => None,
        })
    }

    /// Transactions that began but have no decision.
    fn undecided(&self) -> Vec<GlobalTxId>;
}
