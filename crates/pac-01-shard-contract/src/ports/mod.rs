//! # Ports Module
//!
//! Inbound API of the shard ledger and the contract it hosts.

pub mod inbound;
pub mod outbound;

pub use inbound::ShardLedgerApi;
pub use outbound::Contract;
