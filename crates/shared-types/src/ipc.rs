//! # Shard Invocation Interface
//!
//! Request/response types of the ledger connectivity collaborator and the
//! port ([`ShardInvoker`]) the coordinator consumes it through. One invoker
//! is one connection handle to one shard.

use crate::certificate::HashPair;
use crate::dependency_map::DependencyMap;
use crate::entities::{GlobalTxId, LocalTxId, PacPhase, ShardId, ShardTxStatus};
use crate::errors::{CertificateError, ConnectivityError, Rejection};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One contract invocation against one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Target shard.
    pub shard: ShardId,
    /// Contract operation name, e.g. `TransferAsset`.
    pub operation: String,
    /// Positional operation arguments.
    pub args: Vec<String>,
    /// Correlation payload; absent on plain (non-PAC) requests.
    pub dependency_map: Option<DependencyMap>,
    /// Phase tag; absent on plain requests.
    pub phase: Option<PacPhase>,
}

impl InvokeRequest {
    /// A plain, immediately executed request.
    pub fn plain(shard: ShardId, operation: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            shard,
            operation: operation.into(),
            args,
            dependency_map: None,
            phase: None,
        }
    }

    /// A PAC-tagged request.
    pub fn pac(
        shard: ShardId,
        operation: impl Into<String>,
        args: Vec<String>,
        dependency_map: DependencyMap,
        phase: PacPhase,
    ) -> Self {
        Self {
            shard,
            operation: operation.into(),
            args,
            dependency_map: Some(dependency_map),
            phase: Some(phase),
        }
    }
}

/// Validation outcome reported by the shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// Accepted.
    Valid,
    /// Refused; nothing was applied beyond what the rejection states.
    Rejected(Rejection),
}

/// The shard's answer to an [`InvokeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Accepted or refused.
    pub validation: ValidationStatus,
    /// Operation result (JSON for reads, empty for most writes).
    pub payload: Vec<u8>,
    /// Text message; on PROPOSE and PREPARE the base64 certificate.
    pub message: String,
    /// Shard-local transaction id, set on PAC responses.
    pub local_tx_id: Option<LocalTxId>,
}

impl InvokeResponse {
    /// Accepted response with a payload.
    pub fn valid(payload: Vec<u8>) -> Self {
        Self {
            validation: ValidationStatus::Valid,
            payload,
            message: String::new(),
            local_tx_id: None,
        }
    }

    /// Accepted PAC response carrying a certificate.
    pub fn certified(certificate: &HashPair, local_tx_id: LocalTxId, payload: Vec<u8>) -> Self {
        Self {
            validation: ValidationStatus::Valid,
            payload,
            message: certificate.to_base64(),
            local_tx_id: Some(local_tx_id),
        }
    }

    /// Refused response.
    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            message: rejection.message.clone(),
            validation: ValidationStatus::Rejected(rejection),
            payload: Vec::new(),
            local_tx_id: None,
        }
    }

    /// Was the request accepted?
    pub fn is_valid(&self) -> bool {
        matches!(self.validation, ValidationStatus::Valid)
    }

    /// The rejection, if refused.
    pub fn rejection(&self) -> Option<&Rejection> {
        match &self.validation {
            ValidationStatus::Rejected(rejection) => Some(rejection),
            ValidationStatus::Valid => None,
        }
    }

    /// Decode the certificate carried in the message, if any.
    pub fn certificate(&self) -> Result<Option<HashPair>, CertificateError> {
        if !self.is_valid() || self.message.is_empty() {
            return Ok(None);
        }
        HashPair::from_base64(&self.message).map(Some)
    }
}

/// Connection handle to one shard.
///
/// Implementations own their session state; the coordinator never mutates
/// ledger state except through `invoke`.
#[async_trait]
pub trait ShardInvoker: Send + Sync {
    /// Shard served by this handle.
    fn shard_id(&self) -> &ShardId;

    /// Submit a transaction (plain or PAC-tagged).
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, ConnectivityError>;

    /// Evaluate a read-only operation; nothing is committed.
    async fn query(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ConnectivityError>;

    /// Ask the shard what it knows about a global transaction.
    async fn transaction_status(
        &self,
        global_id: &GlobalTxId,
    ) -> Result<ShardTxStatus, ConnectivityError>;
}
