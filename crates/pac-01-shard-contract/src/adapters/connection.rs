//! In-process connection handle.
//!
//! Implements the [`ShardInvoker`] port over a [`ShardLedgerApi`] living in
//! the same process. Contract errors become rejected responses; only a
//! closed handle or a misaddressed request produce a connectivity error.

use crate::domain::{ContractError, PhaseOutcome};
use crate::ports::ShardLedgerApi;
use async_trait::async_trait;
use shared_types::{
    ConnectivityError, DependencyMap, GlobalTxId, InvokeRequest, InvokeResponse, ShardId,
    ShardInvoker, ShardTxStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Connection handle to a shard ledger hosted in this process.
pub struct InProcessShardConnection {
    shard_id: ShardId,
    ledger: Arc<dyn ShardLedgerApi>,
    open: AtomicBool,
}

impl InProcessShardConnection {
    /// Open a handle to `ledger`.
    pub fn new(ledger: Arc<dyn ShardLedgerApi>) -> Self {
        Self {
            shard_id: ledger.shard_id().clone(),
            ledger,
            open: AtomicBool::new(true),
        }
    }

    /// The ledger behind the handle.
    pub fn ledger(&self) -> &Arc<dyn ShardLedgerApi> {
        &self.ledger
    }

    /// Close the handle; every later call fails with
    /// [`ConnectivityError::Closed`].
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("[pac-01] Connection to {} closed", self.shard_id);
        }
    }

    /// Is the handle still usable?
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), ConnectivityError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ConnectivityError::Closed(self.shard_id.clone()))
        }
    }
}

fn phase_response(outcome: PhaseOutcome, map: &DependencyMap) -> InvokeResponse {
    let local_tx_id = map.own_local_tx_id().ok().flatten();
    match outcome {
        PhaseOutcome::Proposed(receipt) => {
            InvokeResponse::certified(&receipt.certificate, receipt.local_tx_id, receipt.payload)
        }
        PhaseOutcome::Prepared(certificate) => InvokeResponse {
            message: certificate.to_base64(),
            local_tx_id,
            ..InvokeResponse::valid(Vec::new())
        },
        PhaseOutcome::Decided(payload) => InvokeResponse {
            local_tx_id,
            ..InvokeResponse::valid(payload)
        },
        PhaseOutcome::CertificatesAccepted | PhaseOutcome::Aborted { .. } => InvokeResponse {
            local_tx_id,
            ..InvokeResponse::valid(Vec::new())
        },
    }
}

fn rejected(err: &ContractError) -> InvokeResponse {
    InvokeResponse::rejected(err.to_rejection())
}

#[async_trait]
impl ShardInvoker for InProcessShardConnection {
    fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, ConnectivityError> {
        self.ensure_open()?;
        if request.shard != self.shard_id {
            return Err(ConnectivityError::UnknownShard(request.shard));
        }

        let response = match (request.phase, request.dependency_map.as_ref()) {
            (None, _) => match self.ledger.submit(&request.operation, &request.args).await {
                Ok(payload) => InvokeResponse::valid(payload),
                Err(err) => rejected(&err),
            },
            (Some(phase), Some(map)) => {
                match self
                    .ledger
                    .handle_phase(phase, &request.operation, &request.args, map)
                    .await
                {
                    Ok(outcome) => phase_response(outcome, map),
                    Err(err) => rejected(&err),
                }
            }
            (Some(_), None) => rejected(&ContractError::MissingDependencyMap),
        };
        Ok(response)
    }

    async fn query(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.ensure_open()?;
        Ok(match self.ledger.evaluate(operation, args).await {
            Ok(payload) => InvokeResponse::valid(payload),
            Err(err) => rejected(&err),
        })
    }

    async fn transaction_status(
        &self,
        global_id: &GlobalTxId,
    ) -> Result<ShardTxStatus, ConnectivityError> {
        self.ensure_open()?;
        Ok(self.ledger.transaction_status(global_id))
    }
}
