//! # Adapters Layer (Hexagonal Architecture)
//!
//! Shard client facade, default observer and in-memory transaction log.

mod observer;
mod shard_client;
mod transaction_log;

pub use observer::TracingObserver;
pub use shard_client::ShardClient;
pub use transaction_log::InMemoryTransactionLog;
