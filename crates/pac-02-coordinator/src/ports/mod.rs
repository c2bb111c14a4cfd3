//! # Ports Module
//!
//! Inbound API of the coordinator and the collaborators it drives.

pub mod inbound;
pub mod outbound;

pub use inbound::CoordinatorApi;
pub use outbound::{CoordinatorObserver, LogEntry, LogEvent, TransactionLog};
pub use shared_types::ShardInvoker;
