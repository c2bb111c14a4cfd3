//! # Outbound Ports
//!
//! The business contract a shard ledger hosts.

use crate::algorithms::TxSimulator;
use crate::domain::ContractError;

/// A deterministic business contract.
///
/// `execute` must depend only on the simulator's state and the arguments.
/// The ledger relies on this to recompute the same certificate at PREPARE
/// that it issued at PROPOSE.
pub trait Contract: Send + Sync {
    /// Contract name, for logs.
    fn name(&self) -> &'static str;

    /// Run one operation. Reads and writes go through `sim`; the returned
    /// bytes are the operation result.
    fn execute(
        &self,
        sim: &mut TxSimulator<'_>,
        operation: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError>;
}
