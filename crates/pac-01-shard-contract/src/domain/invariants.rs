//! # Domain Invariants
//!
//! Business rules that must always hold on a shard.

use super::errors::ContractError;
use rust_decimal::Decimal;
use shared_types::GlobalTxId;
use std::collections::HashMap;

/// Invariant: balances are never negative.
///
/// Checked on every account write, so a rejected operation leaves neither a
/// mutation nor a lock behind.
pub fn invariant_non_negative_balance(id: &str, balance: Decimal) -> Result<(), ContractError> {
    if balance.is_sign_negative() && !balance.is_zero() {
        return Err(ContractError::NegativeBalance {
            id: id.to_string(),
            balance,
        });
    }
    Ok(())
}

/// Invariant: a key is locked by at most one transaction, and only by the
/// transaction that is asking for it.
pub fn invariant_lock_exclusive<'a>(
    locks: &HashMap<String, GlobalTxId>,
    keys: impl IntoIterator<Item = &'a str>,
    requester: &GlobalTxId,
) -> Result<(), ContractError> {
    for key in keys {
        if let Some(holder) = locks.get(key) {
            if holder != requester {
                return Err(ContractError::LockConflict {
                    key: key.to_string(),
                    holder: *holder,
                });
            }
        }
    }
    Ok(())
}
