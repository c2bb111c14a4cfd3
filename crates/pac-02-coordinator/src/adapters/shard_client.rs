//! Typed phase requests over one [`ShardInvoker`].

use shared_types::{
    ConnectivityError, DependencyMap, GlobalTxId, InvokeRequest, InvokeResponse, PacPhase,
    ShardId, ShardInvoker, ShardTxStatus,
};
use std::sync::Arc;

/// Coordinator-side facade over one shard connection.
#[derive(Clone)]
pub struct ShardClient {
    invoker: Arc<dyn ShardInvoker>,
}

impl ShardClient {
    /// Wrap a connection handle.
    pub fn new(invoker: Arc<dyn ShardInvoker>) -> Self {
        Self { invoker }
    }

    /// Shard behind the handle.
    pub fn shard_id(&self) -> &ShardId {
        self.invoker.shard_id()
    }

    /// Send one PAC-tagged request.
    pub async fn send(
        &self,
        phase: PacPhase,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.invoker
            .invoke(InvokeRequest::pac(
                self.shard_id().clone(),
                operation,
                args.to_vec(),
                map.clone(),
                phase,
            ))
            .await
    }

    /// PROPOSE.
    pub async fn propose(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.send(PacPhase::Propose, operation, args, map).await
    }

    /// SPREAD_CERTIFICATES.
    pub async fn spread_certificates(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.send(PacPhase::SpreadCertificates, operation, args, map)
            .await
    }

    /// PREPARE.
    pub async fn prepare(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.send(PacPhase::Prepare, operation, args, map).await
    }

    /// DECIDE.
    pub async fn decide(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.send(PacPhase::Decide, operation, args, map).await
    }

    /// ABORT.
    pub async fn abort(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.send(PacPhase::Abort, operation, args, map).await
    }

    /// Plain, immediately executed request.
    pub async fn invoke(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.invoker
            .invoke(InvokeRequest::plain(
                self.shard_id().clone(),
                operation,
                args.to_vec(),
            ))
            .await
    }

    /// Read-only query.
    pub async fn query(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ConnectivityError> {
        self.invoker.query(operation, args).await
    }

    /// Shard-side status of a global transaction.
    pub async fn transaction_status(
        &self,
        global_id: &GlobalTxId,
    ) -> Result<ShardTxStatus, ConnectivityError> {
        self.invoker.transaction_status(global_id).await
    }
}
