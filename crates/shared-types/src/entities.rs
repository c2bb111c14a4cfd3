//! # Core Domain Entities
//!
//! Identifiers and enums shared by the coordinator and the shard contracts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Name of a shard (ledger partition), e.g. `mychannel1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(String);

impl ShardId {
    /// Create a shard identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The shard name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShardId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ShardId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identifier of one global (cross-shard) transaction.
///
/// Locks on every shard are owned by this identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalTxId(Uuid);

impl GlobalTxId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GlobalTxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GlobalTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GlobalTxId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Shard-local transaction identifier, issued by a shard at PROPOSE.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalTxId(String);

impl LocalTxId {
    /// Wrap an identifier received over the wire.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier a shard issues for its `sequence`-th proposal.
    pub fn derive(shard: &ShardId, global: &GlobalTxId, sequence: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(shard.as_str().as_bytes());
        hasher.update(global.as_uuid().as_bytes());
        hasher.update(sequence.to_le_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalTxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phase tag carried by a PAC request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacPhase {
    /// Tentative execution; returns a certificate and takes the locks.
    Propose,
    /// Every shard learns every peer's certificate.
    SpreadCertificates,
    /// Re-validation; the shard becomes durably locked.
    Prepare,
    /// Apply the write and release the locks.
    Decide,
    /// Discard the tentative write and release the locks.
    Abort,
}

impl PacPhase {
    /// Wire name, as printed in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Propose => "PROPOSE",
            Self::SpreadCertificates => "SPREAD_CERTIFICATES",
            Self::Prepare => "PREPARE",
            Self::Decide => "DECIDE",
            Self::Abort => "ABORT",
        }
    }
}

impl fmt::Display for PacPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a shard knows about a global transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShardTxStatus {
    /// Never proposed on this shard.
    #[default]
    Unknown,
    /// Proposed; locks held; not yet prepared.
    Proposed,
    /// Prepared; locks held; waiting for the decision.
    Prepared,
    /// Decided; write applied, locks released.
    Committed,
    /// Aborted; nothing applied, locks released.
    Aborted,
}

impl ShardTxStatus {
    /// Does the shard currently hold locks for the transaction?
    pub fn holds_locks(&self) -> bool {
        matches!(self, Self::Proposed | Self::Prepared)
    }

    /// Is the transaction resolved on the shard?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}
