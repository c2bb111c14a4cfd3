//! # Runtime Profile
//!
//! Which shards exist, which contract each one runs, and how the
//! coordinator behaves.
//!
//! ```toml
//! [[shards]]
//! name = "mychannel1"
//! contract = "asset"
//!
//! [[shards]]
//! name = "mychannel2"
//! contract = "account"
//!
//! [coordinator]
//! max_retries = 3
//! retry_backoff_ms = 200
//! concurrent_dispatch = true
//!
//! [demo]
//! label = "Test attempt"
//! ```
//!
//! ## Environment overrides
//!
//! - `PAC_MAX_RETRIES`
//! - `PAC_RETRY_BACKOFF_MS`
//! - `PAC_CONCURRENT_DISPATCH` (`true`/`1`)

use pac_02_coordinator::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Profile errors.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The file could not be read.
    #[error("cannot read profile {path}: {source}")]
    Io {
        /// Profile path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for a profile.
    #[error("invalid profile: {0}")]
    Parse(#[from] toml::de::Error),

    /// No `[[shards]]` entries.
    #[error("profile declares no shards")]
    NoShards,

    /// Two shards share a name.
    #[error("shard {0} is declared twice")]
    DuplicateShard(String),

    /// A shard name is empty.
    #[error("shard names must not be empty")]
    EmptyShardName,
}

/// Business contract hosted by a shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Asset contract.
    Asset,
    /// Account contract.
    Account,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Asset => f.write_str("asset"),
            ContractKind::Account => f.write_str("account"),
        }
    }
}

/// One shard of the deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardProfile {
    /// Shard name (channel).
    pub name: String,
    /// Hosted contract.
    pub contract: ContractKind,
}

/// Demo settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoProfile {
    /// Label of the demo transaction.
    pub label: String,
}

impl Default for DemoProfile {
    fn default() -> Self {
        Self {
            label: "Test attempt".to_string(),
        }
    }
}

/// Complete runtime profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Shards to bootstrap.
    pub shards: Vec<ShardProfile>,
    /// Coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Demo settings.
    #[serde(default)]
    pub demo: DemoProfile,
}

impl Profile {
    /// Read, parse and validate a profile file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_toml_str(&text)?;
        info!(
            "Loaded profile {} with {} shard(s)",
            path.display(),
            profile.shards.len()
        );
        Ok(profile)
    }

    /// Parse and validate profile text.
    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check shard names.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.shards.is_empty() {
            return Err(ProfileError::NoShards);
        }
        let mut seen = BTreeSet::new();
        for shard in &self.shards {
            if shard.name.trim().is_empty() {
                return Err(ProfileError::EmptyShardName);
            }
            if !seen.insert(shard.name.as_str()) {
                return Err(ProfileError::DuplicateShard(shard.name.clone()));
            }
        }
        Ok(())
    }

    /// Apply `PAC_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("PAC_MAX_RETRIES") {
            match value.parse() {
                Ok(retries) => self.coordinator.max_retries = retries,
                Err(_) => warn!("Ignoring PAC_MAX_RETRIES={value:?}"),
            }
        }
        if let Some(value) = lookup("PAC_RETRY_BACKOFF_MS") {
            match value.parse() {
                Ok(ms) => self.coordinator.retry_backoff_ms = ms,
                Err(_) => warn!("Ignoring PAC_RETRY_BACKOFF_MS={value:?}"),
            }
        }
        if let Some(value) = lookup("PAC_CONCURRENT_DISPATCH") {
            self.coordinator.concurrent_dispatch = value.to_lowercase() == "true" || value == "1";
        }
    }

    /// First shard hosting `kind`.
    pub fn first_of(&self, kind: ContractKind) -> Option<&ShardProfile> {
        self.shards.iter().find(|s| s.contract == kind)
    }
}
