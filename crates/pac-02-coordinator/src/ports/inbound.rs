//! # Inbound Ports
//!
//! API trait defining what the coordinator can do.

use crate::domain::{CoordinatorError, PhaseReport, ShardOperation, TxOutcome};
use async_trait::async_trait;
use shared_types::{GlobalTxId, InvokeResponse, ShardId};
use std::collections::BTreeMap;

/// Transaction coordinator API - inbound port.
///
/// Phase methods run one phase against every participant and return once
/// all of them answered. A failed phase before the commit point aborts the
/// transaction everywhere and returns
/// [`CoordinatorError::TransactionAborted`].
#[async_trait]
pub trait CoordinatorApi: Send + Sync {
    /// Create a global transaction; nothing is sent yet.
    async fn begin(
        &self,
        label: &str,
        operations: Vec<ShardOperation>,
        metadata: BTreeMap<String, Vec<u8>>,
    ) -> Result<GlobalTxId, CoordinatorError>;

    /// PROPOSE on every participant.
    async fn propose(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError>;

    /// SPREAD_CERTIFICATES on every participant.
    async fn spread_certificates(&self, id: &GlobalTxId)
        -> Result<PhaseReport, CoordinatorError>;

    /// PREPARE on every participant. Calling it again on a prepared
    /// transaction re-sends PREPARE; the shards' refusals are reported as
    /// tolerated.
    async fn prepare(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError>;

    /// DECIDE on every participant not yet decided.
    async fn decide(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError>;

    /// ABORT on every participant that may hold locks. Refused after the
    /// commit point.
    async fn abort(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError>;

    /// Run the whole sequence. An abort is an `Ok` outcome; errors are
    /// reserved for misuse and in-doubt decisions.
    async fn execute(
        &self,
        label: &str,
        operations: Vec<ShardOperation>,
    ) -> Result<(GlobalTxId, TxOutcome), CoordinatorError>;

    /// Outcome of a transaction, live or from the log.
    fn outcome(&self, id: &GlobalTxId) -> Option<TxOutcome>;

    /// Read-only query on one shard.
    async fn query(
        &self,
        shard: &ShardId,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, CoordinatorError>;

    /// Plain (non-PAC) transaction on one shard.
    async fn invoke(
        &self,
        shard: &ShardId,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, CoordinatorError>;
}
