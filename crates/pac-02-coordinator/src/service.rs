//! # Coordinator Service
//!
//! Drives global transactions through PROPOSE, SPREAD_CERTIFICATES, PREPARE
//! and DECIDE (or ABORT) against the registered shards.
//!
//! ## Locking discipline
//!
//! Transactions live behind a `parking_lot::RwLock`. Every phase clones what
//! it needs, drops the guard, dispatches to the shards and re-acquires the
//! guard to record the replies. No guard is ever held across an `.await`.
//!
//! ## Indeterminate replies
//!
//! A connectivity error is neither success nor failure. The shard's
//! transaction status is queried and, depending on the phase, the call is
//! treated as applied, re-sent, or given up on. Before the commit point a
//! shard that cannot be resolved aborts the transaction; after it, the
//! transaction stays prepared and [`CoordinatorError::InDoubt`] is returned.

use crate::adapters::{InMemoryTransactionLog, ShardClient, TracingObserver};
use crate::algorithms::{classify_status, decide_outcome};
use crate::domain::{
    invariant_no_partial_commit, invariant_unanimous_prepare, AbortReason, CoordinatorConfig,
    CoordinatorError, GlobalPhase, GlobalTransaction, PhaseReport, ShardOperation, ShardReply,
    ShardStage, StatusVerdict, TxOutcome,
};
use crate::ports::{
    CoordinatorApi, CoordinatorObserver, LogEntry, LogEvent, ShardInvoker, TransactionLog,
};
use async_trait::async_trait;
use futures::future::{join_all, BoxFuture, FutureExt};
use parking_lot::RwLock;
use shared_types::{
    DependencyMap, GlobalTxId, InvokeResponse, PacPhase, Rejection, RejectionKind, ShardId,
    ValidationStatus,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// One phase call to one shard.
struct PhaseCall {
    client: ShardClient,
    operation: String,
    args: Vec<String>,
    map: DependencyMap,
}

/// The transaction coordinator.
pub struct Coordinator {
    config: CoordinatorConfig,
    shards: RwLock<BTreeMap<ShardId, ShardClient>>,
    transactions: RwLock<HashMap<GlobalTxId, GlobalTransaction>>,
    observer: Arc<dyn CoordinatorObserver>,
    log: Arc<dyn TransactionLog>,
}

impl Coordinator {
    /// Create a coordinator with the tracing observer and an in-memory log.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            shards: RwLock::new(BTreeMap::new()),
            transactions: RwLock::new(HashMap::new()),
            observer: Arc::new(TracingObserver),
            log: Arc::new(InMemoryTransactionLog::new()),
        }
    }

    /// Replace the progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn CoordinatorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the transaction log.
    pub fn with_log(mut self, log: Arc<dyn TransactionLog>) -> Self {
        self.log = log;
        self
    }

    /// Register the connection handle of one shard.
    ///
    /// A second handle for the same shard replaces the first.
    pub fn register_shard(&self, invoker: Arc<dyn ShardInvoker>) {
        let client = ShardClient::new(invoker);
        info!("[pac-02] Registered shard {}", client.shard_id());
        self.shards.write().insert(client.shard_id().clone(), client);
    }

    /// Registered shards.
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.read().keys().cloned().collect()
    }

    /// Configuration in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Transaction log in use.
    pub fn log(&self) -> Arc<dyn TransactionLog> {
        Arc::clone(&self.log)
    }

    /// Snapshot of an in-flight transaction.
    ///
    /// Decided transactions are dropped; their outcome stays available
    /// through [`CoordinatorApi::outcome`].
    pub fn transaction(&self, id: &GlobalTxId) -> Option<GlobalTransaction> {
        self.transactions.read().get(id).cloned()
    }

    /// Number of in-flight transactions.
    pub fn in_flight(&self) -> usize {
        self.transactions.read().len()
    }

    fn client(&self, shard: &ShardId) -> Result<ShardClient, CoordinatorError> {
        self.shards
            .read()
            .get(shard)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownShard(shard.clone()))
    }

    /// Clone the in-flight transaction, or explain why there is none.
    fn snapshot(&self, id: &GlobalTxId) -> Result<GlobalTransaction, CoordinatorError> {
        self.transaction(id)
            .ok_or(CoordinatorError::UnknownTransaction(*id))
    }

    fn update<T>(
        &self,
        id: &GlobalTxId,
        f: impl FnOnce(&mut GlobalTransaction) -> Result<T, CoordinatorError>,
    ) -> Result<T, CoordinatorError> {
        let mut transactions = self.transactions.write();
        let tx = transactions
            .get_mut(id)
            .ok_or(CoordinatorError::UnknownTransaction(*id))?;
        f(tx)
    }

    fn record_phase(&self, id: &GlobalTxId, phase: GlobalPhase) {
        self.log
            .record(LogEntry::now(*id, LogEvent::PhaseReached(phase)));
    }

    /// Record the decision and forget the transaction.
    fn finish(&self, id: &GlobalTxId, outcome: TxOutcome) {
        self.transactions.write().remove(id);
        self.log
            .record(LogEntry::now(*id, LogEvent::Decided(outcome.clone())));
        self.observer.outcome(id, &outcome);
    }

    /// Build one call per listed shard.
    ///
    /// With `spread` set the map carries every certificate; each copy is
    /// addressed to the recipient's own local tx id when one is known.
    fn calls(
        &self,
        tx: &GlobalTransaction,
        shards: &[ShardId],
        spread: bool,
    ) -> Result<Vec<PhaseCall>, CoordinatorError> {
        let map = if spread {
            tx.base_map.with_certificates(&tx.certificates())?
        } else {
            tx.base_map.clone()
        };

        let mut calls = Vec::with_capacity(shards.len());
        for shard in shards {
            let progress = tx
                .progress(shard)
                .ok_or_else(|| CoordinatorError::UnknownShard(shard.clone()))?;
            let map = match &progress.local_tx_id {
                Some(local) => map.addressed_to(local),
                None => map.clone(),
            };
            calls.push(PhaseCall {
                client: self.client(shard)?,
                operation: progress.operation.operation.clone(),
                args: progress.operation.args.clone(),
                map,
            });
        }
        Ok(calls)
    }

    /// Send one phase to every call target and wait for all of them.
    async fn dispatch(
        &self,
        tx_id: GlobalTxId,
        phase: PacPhase,
        calls: Vec<PhaseCall>,
    ) -> Vec<(ShardId, ShardReply)> {
        let shards: Vec<ShardId> = calls.iter().map(|c| c.client.shard_id().clone()).collect();
        self.observer.phase_started(&tx_id, phase, &shards);

        let futures: Vec<BoxFuture<'_, (ShardId, ShardReply)>> = calls
            .into_iter()
            .map(|call| {
                async move {
                    let reply = self.call_shard(tx_id, phase, &call).await;
                    (call.client.shard_id().clone(), reply)
                }
                .boxed()
            })
            .collect();

        let replies = if self.config.concurrent_dispatch {
            join_all(futures).await
        } else {
            let mut replies = Vec::with_capacity(futures.len());
            for future in futures {
                replies.push(future.await);
            }
            replies
        };

        for (shard, reply) in &replies {
            self.observer.shard_responded(&tx_id, phase, shard, reply);
        }
        replies
    }

    /// One phase call, resolving connectivity errors through status queries.
    async fn call_shard(&self, tx_id: GlobalTxId, phase: PacPhase, call: &PhaseCall) -> ShardReply {
        let shard = call.client.shard_id();
        let mut attempt = 0u32;
        let mut resend = true;

        loop {
            if resend {
                match call
                    .client
                    .send(phase, &call.operation, &call.args, &call.map)
                    .await
                {
                    Ok(response) => return reply_of(response),
                    Err(err) => warn!("[pac-02] {} {} on {}: {}", tx_id, phase, shard, err),
                }
            }

            if attempt >= self.config.max_retries {
                error!(
                    "[pac-02] {} {} on {}: gave up after {} attempt(s)",
                    tx_id, phase, shard, attempt
                );
                return ShardReply::Indeterminate;
            }
            attempt += 1;
            tokio::time::sleep(self.config.backoff(attempt)).await;

            match call.client.transaction_status(&tx_id).await {
                Ok(status) => match classify_status(phase, status) {
                    StatusVerdict::Applied => return ShardReply::AppliedWithoutResponse,
                    StatusVerdict::Unresolvable => {
                        warn!(
                            "[pac-02] {} {} on {}: shard reports {:?}, cannot resolve",
                            tx_id, phase, shard, status
                        );
                        return ShardReply::Indeterminate;
                    }
                    StatusVerdict::Resend => {
                        self.observer.retrying(&tx_id, phase, shard, attempt);
                        resend = true;
                    }
                },
                Err(err) => {
                    debug!("[pac-02] {} status query on {} failed: {}", tx_id, shard, err);
                    resend = false;
                }
            }
        }
    }

    /// Abort after a failed phase and surface the reason.
    async fn fail(&self, id: &GlobalTxId, reason: AbortReason) -> CoordinatorError {
        warn!("[pac-02] {} failing: {}", id, reason);
        if let Err(err) = self.abort_with(id, reason.clone()).await {
            error!("[pac-02] {} abort after failure did not complete: {}", id, err);
        }
        CoordinatorError::TransactionAborted { id: *id, reason }
    }

    /// Send ABORT to every shard that may hold locks and record the decision.
    async fn abort_with(
        &self,
        id: &GlobalTxId,
        reason: AbortReason,
    ) -> Result<PhaseReport, CoordinatorError> {
        let tx = self.snapshot(id)?;
        if tx.phase.past_commit_point() {
            return Err(CoordinatorError::CommitPointPassed(*id));
        }

        let holders = tx.lock_holders();
        let spread = tx.phase == GlobalPhase::CertificatesSpread;
        let calls = self.calls(&tx, &holders, spread)?;
        let replies = self.dispatch(*id, PacPhase::Abort, calls).await;

        let mut report = PhaseReport::new(PacPhase::Abort);
        self.update(id, |tx| {
            for (shard, reply) in &replies {
                let Some(progress) = tx.shards.get_mut(shard) else {
                    continue;
                };
                if reply.is_applied() {
                    progress.stage = ShardStage::Aborted;
                    report.applied.push(shard.clone());
                } else {
                    // Locks on this shard stay until an external
                    // reconciliation pass releases them.
                    error!("[pac-02] {} ABORT not confirmed by {}", tx.id, shard);
                }
            }
            tx.transition(GlobalPhase::Aborted)?;
            tx.outcome = TxOutcome::Aborted(reason.clone());
            invariant_no_partial_commit(tx)
        })?;

        self.observer.phase_completed(id, &report);
        self.finish(id, TxOutcome::Aborted(reason));
        Ok(report)
    }
}

fn reply_of(response: InvokeResponse) -> ShardReply {
    match &response.validation {
        ValidationStatus::Valid => ShardReply::Accepted(response),
        ValidationStatus::Rejected(rejection) => ShardReply::Rejected(rejection.clone()),
    }
}

/// First reply that failed, as an abort reason.
fn protocol_error(shard: &ShardId, phase: PacPhase, detail: impl Into<String>) -> AbortReason {
    AbortReason::Protocol {
        shard: shard.clone(),
        phase,
        detail: detail.into(),
    }
}

/// Failure of a phase past the commit point, which must not abort.
fn after_commit_point(id: &GlobalTxId, reason: AbortReason) -> CoordinatorError {
    match reason {
        AbortReason::Rejected {
            shard,
            kind,
            message,
            ..
        } => CoordinatorError::Rejected {
            shard,
            rejection: Rejection::new(kind, message),
        },
        AbortReason::Indeterminate { shard, .. } | AbortReason::Protocol { shard, .. } => {
            CoordinatorError::InDoubt { id: *id, shard }
        }
        AbortReason::Cancelled => CoordinatorError::CommitPointPassed(*id),
    }
}

#[async_trait]
impl CoordinatorApi for Coordinator {
    async fn begin(
        &self,
        label: &str,
        operations: Vec<ShardOperation>,
        metadata: BTreeMap<String, Vec<u8>>,
    ) -> Result<GlobalTxId, CoordinatorError> {
        for op in &operations {
            self.client(&op.shard)?;
        }
        let tx = GlobalTransaction::new(label, operations, &metadata)?;
        let id = tx.id;

        info!(
            "[pac-02] Begin {} '{}' on {} shard(s)",
            id,
            label,
            tx.participants.len()
        );
        self.log.record(LogEntry::now(
            id,
            LogEvent::Begun {
                label: tx.label.clone(),
                participants: tx.participants.clone(),
            },
        ));
        self.transactions.write().insert(id, tx);
        Ok(id)
    }

    #[instrument(skip(self), fields(tx = %id))]
    async fn propose(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError> {
        let tx = self.snapshot(id)?;
        let untouched = tx.all_at(ShardStage::Pending);
        if tx.phase != GlobalPhase::Proposed || !untouched {
            return Err(CoordinatorError::InvalidTransition {
                id: *id,
                from: tx.phase,
                to: GlobalPhase::Certified,
            });
        }

        let calls = self.calls(&tx, &tx.participants, false)?;
        let replies = self.dispatch(*id, PacPhase::Propose, calls).await;

        let mut report = PhaseReport::new(PacPhase::Propose);
        let protocol = self.update(id, |tx| {
            let mut protocol = None;
            for (shard, reply) in &replies {
                let Some(progress) = tx.shards.get_mut(shard) else {
                    continue;
                };
                match reply {
                    ShardReply::Accepted(response) => {
                        // Accepted means locks are held, whatever the payload says.
                        progress.stage = ShardStage::Proposed;
                        match (response.certificate(), &response.local_tx_id) {
                            (Ok(Some(certificate)), Some(local)) => {
                                progress.certificate = Some(certificate);
                                progress.local_tx_id = Some(local.clone());
                                report.applied.push(shard.clone());
                            }
                            (Err(err), _) => {
                                protocol.get_or_insert_with(|| {
                                    protocol_error(shard, PacPhase::Propose, err.to_string())
                                });
                            }
                            _ => {
                                protocol.get_or_insert_with(|| {
                                    protocol_error(
                                        shard,
                                        PacPhase::Propose,
                                        "missing certificate or local tx id",
                                    )
                                });
                            }
                        }
                    }
                    ShardReply::Indeterminate => progress.stage = ShardStage::Uncertain,
                    // A refused proposal locks nothing.
                    ShardReply::Rejected(_) | ShardReply::AppliedWithoutResponse => {}
                }
            }
            Ok(protocol)
        })?;

        if let Err(reason) = decide_outcome(
            PacPhase::Propose,
            replies.iter().map(|(s, r)| (s, r)),
            |_, _| false,
        ) {
            return Err(self.fail(id, reason).await);
        }
        if let Some(reason) = protocol {
            return Err(self.fail(id, reason).await);
        }

        self.update(id, |tx| tx.transition(GlobalPhase::Certified))?;
        self.record_phase(id, GlobalPhase::Certified);
        self.observer.phase_completed(id, &report);
        Ok(report)
    }

    #[instrument(skip(self), fields(tx = %id))]
    async fn spread_certificates(
        &self,
        id: &GlobalTxId,
    ) -> Result<PhaseReport, CoordinatorError> {
        let tx = self.snapshot(id)?;
        if tx.phase != GlobalPhase::Certified {
            return Err(CoordinatorError::InvalidTransition {
                id: *id,
                from: tx.phase,
                to: GlobalPhase::CertificatesSpread,
            });
        }

        let calls = self.calls(&tx, &tx.participants, true)?;
        let replies = self
            .dispatch(*id, PacPhase::SpreadCertificates, calls)
            .await;

        let mut report = PhaseReport::new(PacPhase::SpreadCertificates);
        self.update(id, |tx| {
            for (shard, reply) in &replies {
                if let (true, Some(progress)) = (reply.is_applied(), tx.shards.get_mut(shard)) {
                    progress.stage = ShardStage::CertificatesSpread;
                    report.applied.push(shard.clone());
                }
            }
            Ok(())
        })?;

        if let Err(reason) = decide_outcome(
            PacPhase::SpreadCertificates,
            replies.iter().map(|(s, r)| (s, r)),
            |_, _| false,
        ) {
            return Err(self.fail(id, reason).await);
        }

        self.update(id, |tx| tx.transition(GlobalPhase::CertificatesSpread))?;
        self.record_phase(id, GlobalPhase::CertificatesSpread);
        self.observer.phase_completed(id, &report);
        Ok(report)
    }

    #[instrument(skip(self), fields(tx = %id))]
    async fn prepare(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError> {
        let tx = self.snapshot(id)?;
        let repeated = match tx.phase {
            GlobalPhase::CertificatesSpread => false,
            GlobalPhase::Prepared => true,
            from => {
                return Err(CoordinatorError::InvalidTransition {
                    id: *id,
                    from,
                    to: GlobalPhase::Prepared,
                })
            }
        };

        let calls = self.calls(&tx, &tx.participants, true)?;
        let replies = self.dispatch(*id, PacPhase::Prepare, calls).await;

        // A refusal as already prepared is harmless only where our own
        // bookkeeping shows an earlier PREPARE succeeded.
        let tolerate = |shard: &ShardId, rejection: &Rejection| {
            rejection.kind == RejectionKind::AlreadyPrepared
                && tx
                    .progress(shard)
                    .is_some_and(|p| p.stage == ShardStage::Prepared)
        };

        let mut report = PhaseReport::new(PacPhase::Prepare);
        let protocol = self.update(id, |current| {
            let mut protocol = None;
            for (shard, reply) in &replies {
                let Some(progress) = current.shards.get_mut(shard) else {
                    continue;
                };
                match reply {
                    ShardReply::Accepted(response) => {
                        match response.certificate() {
                            Ok(Some(recomputed)) if Some(recomputed) != progress.certificate => {
                                protocol.get_or_insert_with(|| {
                                    protocol_error(
                                        shard,
                                        PacPhase::Prepare,
                                        format!("certificate changed to {recomputed}"),
                                    )
                                });
                            }
                            Err(err) => {
                                protocol.get_or_insert_with(|| {
                                    protocol_error(shard, PacPhase::Prepare, err.to_string())
                                });
                            }
                            Ok(_) => {}
                        }
                        progress.stage = ShardStage::Prepared;
                        report.applied.push(shard.clone());
                    }
                    ShardReply::AppliedWithoutResponse => {
                        progress.stage = ShardStage::Prepared;
                        report.applied.push(shard.clone());
                    }
                    ShardReply::Rejected(rejection) if tolerate(shard, rejection) => {
                        report.tolerated.push((shard.clone(), rejection.clone()));
                    }
                    ShardReply::Rejected(_) | ShardReply::Indeterminate => {}
                }
            }
            Ok(protocol)
        })?;

        let verdict = decide_outcome(
            PacPhase::Prepare,
            replies.iter().map(|(s, r)| (s, r)),
            tolerate,
        )
        .and_then(|()| protocol.map_or(Ok(()), Err));

        if let Err(reason) = verdict {
            if repeated {
                return Err(after_commit_point(id, reason));
            }
            return Err(self.fail(id, reason).await);
        }

        if !repeated {
            self.update(id, |tx| {
                invariant_unanimous_prepare(tx)?;
                tx.transition(GlobalPhase::Prepared)
            })?;
            self.record_phase(id, GlobalPhase::Prepared);
        }
        self.observer.phase_completed(id, &report);
        Ok(report)
    }

    #[instrument(skip(self), fields(tx = %id))]
    async fn decide(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError> {
        let tx = match self.transaction(id) {
            Some(tx) => tx,
            None => {
                return match self.log.decision(id) {
                    Some(TxOutcome::Committed) => Ok(PhaseReport::new(PacPhase::Decide)),
                    Some(TxOutcome::Aborted(reason)) => {
                        Err(CoordinatorError::TransactionAborted { id: *id, reason })
                    }
                    _ => Err(CoordinatorError::UnknownTransaction(*id)),
                };
            }
        };
        if tx.phase != GlobalPhase::Prepared {
            return Err(CoordinatorError::InvalidTransition {
                id: *id,
                from: tx.phase,
                to: GlobalPhase::Committed,
            });
        }
        invariant_unanimous_prepare(&tx)?;

        let remaining: Vec<ShardId> = tx
            .participants
            .iter()
            .filter(|s| tx.progress(s).is_some_and(|p| p.stage == ShardStage::Prepared))
            .cloned()
            .collect();
        let calls = self.calls(&tx, &remaining, true)?;
        let replies = self.dispatch(*id, PacPhase::Decide, calls).await;

        let mut report = PhaseReport::new(PacPhase::Decide);
        self.update(id, |tx| {
            for (shard, reply) in &replies {
                if let (true, Some(progress)) = (reply.is_applied(), tx.shards.get_mut(shard)) {
                    progress.stage = ShardStage::Decided;
                    report.applied.push(shard.clone());
                }
            }
            invariant_no_partial_commit(tx)
        })?;

        if let Err(reason) = decide_outcome(
            PacPhase::Decide,
            replies.iter().map(|(s, r)| (s, r)),
            |_, _| false,
        ) {
            error!("[pac-02] {} DECIDE incomplete: {}", id, reason);
            return Err(after_commit_point(id, reason));
        }

        self.update(id, |tx| {
            tx.transition(GlobalPhase::Committed)?;
            tx.outcome = TxOutcome::Committed;
            Ok(())
        })?;
        self.record_phase(id, GlobalPhase::Committed);
        self.observer.phase_completed(id, &report);
        self.finish(id, TxOutcome::Committed);
        Ok(report)
    }

    #[instrument(skip(self), fields(tx = %id))]
    async fn abort(&self, id: &GlobalTxId) -> Result<PhaseReport, CoordinatorError> {
        if self.transaction(id).is_none() {
            return match self.log.decision(id) {
                Some(TxOutcome::Aborted(_)) => Ok(PhaseReport::new(PacPhase::Abort)),
                Some(TxOutcome::Committed) => Err(CoordinatorError::CommitPointPassed(*id)),
                _ => Err(CoordinatorError::UnknownTransaction(*id)),
            };
        }
        self.abort_with(id, AbortReason::Cancelled).await
    }

    async fn execute(
        &self,
        label: &str,
        operations: Vec<ShardOperation>,
    ) -> Result<(GlobalTxId, TxOutcome), CoordinatorError> {
        let id = self.begin(label, operations, BTreeMap::new()).await?;

        let run = async {
            self.propose(&id).await?;
            self.spread_certificates(&id).await?;
            self.prepare(&id).await?;
            self.decide(&id).await?;
            Ok::<(), CoordinatorError>(())
        };

        match run.await {
            Ok(()) => Ok((id, TxOutcome::Committed)),
            Err(CoordinatorError::TransactionAborted { reason, .. }) => {
                Ok((id, TxOutcome::Aborted(reason)))
            }
            Err(err) => Err(err),
        }
    }

    fn outcome(&self, id: &GlobalTxId) -> Option<TxOutcome> {
        if let Some(tx) = self.transactions.read().get(id) {
            return Some(tx.outcome.clone());
        }
        self.log.decision(id)
    }

    async fn query(
        &self,
        shard: &ShardId,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, CoordinatorError> {
        let response = self.client(shard)?.query(operation, args).await?;
        Ok(response)
    }

    async fn invoke(
        &self,
        shard: &ShardId,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, CoordinatorError> {
        let response = self.client(shard)?.invoke(operation, args).await?;
        Ok(response)
    }
}
