//! # Inbound Ports
//!
//! API trait defining what a shard ledger can do: plain execution, queries,
//! and the five PAC phases.

use crate::domain::{ContractError, PhaseOutcome, ProposalReceipt};
use async_trait::async_trait;
use shared_types::{DependencyMap, GlobalTxId, HashPair, PacPhase, ShardId, ShardTxStatus};
use std::collections::BTreeMap;

/// Shard ledger API - inbound port.
#[async_trait]
pub trait ShardLedgerApi: Send + Sync {
    /// Shard served by this ledger.
    fn shard_id(&self) -> &ShardId;

    /// Execute and commit an operation immediately (no PAC tag).
    ///
    /// Refused with a lock conflict if it writes a key locked by an
    /// in-flight PAC transaction.
    async fn submit(&self, operation: &str, args: &[String]) -> Result<Vec<u8>, ContractError>;

    /// Evaluate an operation without committing anything.
    async fn evaluate(&self, operation: &str, args: &[String])
        -> Result<Vec<u8>, ContractError>;

    /// PROPOSE: simulate, lock every key read or written, issue a certificate.
    async fn propose(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<ProposalReceipt, ContractError>;

    /// SPREAD_CERTIFICATES: check and store every participant's certificate.
    async fn spread_certificates(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<(), ContractError>;

    /// PREPARE: recompute and compare the certificate, confirm the locks.
    async fn prepare(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<HashPair, ContractError>;

    /// DECIDE: apply the buffered write set and release the locks.
    async fn decide(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<Vec<u8>, ContractError>;

    /// ABORT: discard the buffered write set and release the locks.
    ///
    /// Returns `false` when there was nothing to release.
    async fn abort(&self, map: &DependencyMap) -> Result<bool, ContractError>;

    /// What this shard knows about a global transaction.
    fn transaction_status(&self, global_id: &GlobalTxId) -> ShardTxStatus;

    /// Currently locked keys and their holders.
    fn locked_keys(&self) -> BTreeMap<String, GlobalTxId>;

    /// Dispatch a PAC-tagged request to its phase handler.
    async fn handle_phase(
        &self,
        phase: PacPhase,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<PhaseOutcome, ContractError> {
        match phase {
            PacPhase::Propose => self
                .propose(operation, args, map)
                .await
                .map(PhaseOutcome::Proposed),
            PacPhase::SpreadCertificates => self
                .spread_certificates(operation, args, map)
                .await
                .map(|()| PhaseOutcome::CertificatesAccepted),
            PacPhase::Prepare => self
                .prepare(operation, args, map)
                .await
                .map(PhaseOutcome::Prepared),
            PacPhase::Decide => self
                .decide(operation, args, map)
                .await
                .map(PhaseOutcome::Decided),
            PacPhase::Abort => self
                .abort(map)
                .await
                .map(|released| PhaseOutcome::Aborted { released }),
        }
    }
}
