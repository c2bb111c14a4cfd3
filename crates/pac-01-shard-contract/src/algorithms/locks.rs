//! # Key Lock Table
//!
//! Exclusive per-key locks owned by global transaction ids. A lock is taken
//! at PROPOSE for every key the transaction read or wrote and dropped only by
//! DECIDE or ABORT of the same transaction.

use crate::domain::{invariant_lock_exclusive, ContractError};
use shared_types::GlobalTxId;
use std::collections::{BTreeMap, HashMap};

/// Locked keys and their holders.
#[derive(Clone, Debug, Default)]
pub struct LockTable {
    locks: HashMap<String, GlobalTxId>,
}

impl LockTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a lock conflict if any key is held by someone other than
    /// `requester`.
    pub fn check<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
        requester: &GlobalTxId,
    ) -> Result<(), ContractError> {
        invariant_lock_exclusive(&self.locks, keys, requester)
    }

    /// Fail if any key is locked at all. Used by plain writes.
    pub fn check_unlocked<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ContractError> {
        for key in keys {
            if let Some(holder) = self.locks.get(key) {
                return Err(ContractError::LockConflict {
                    key: key.to_string(),
                    holder: *holder,
                });
            }
        }
        Ok(())
    }

    /// Lock every key for `owner`, all or nothing.
    pub fn acquire<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a str> + Clone,
        owner: &GlobalTxId,
    ) -> Result<(), ContractError> {
        self.check(keys.clone(), owner)?;
        for key in keys {
            self.locks.insert(key.to_string(), *owner);
        }
        Ok(())
    }

    /// Drop every lock held by `owner`; returns how many were released.
    pub fn release_all(&mut self, owner: &GlobalTxId) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, holder| holder != owner);
        before - self.locks.len()
    }

    /// Holder of `key`, if locked.
    pub fn holder(&self, key: &str) -> Option<&GlobalTxId> {
        self.locks.get(key)
    }

    /// Does `owner` still hold every one of `keys`?
    pub fn holds_all<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
        owner: &GlobalTxId,
    ) -> bool {
        keys.into_iter()
            .all(|key| self.locks.get(key) == Some(owner))
    }

    /// Keys held by `owner`, sorted.
    pub fn held_by(&self, owner: &GlobalTxId) -> Vec<String> {
        let mut keys: Vec<_> = self
            .locks
            .iter()
            .filter(|(_, holder)| *holder == owner)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// All locks, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, GlobalTxId> {
        self.locks
            .iter()
            .map(|(key, holder)| (key.clone(), *holder))
            .collect()
    }

    /// Number of locked keys.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True when nothing is locked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
