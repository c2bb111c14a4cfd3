//! # Adapters Layer (Hexagonal Architecture)
//!
//! Business contracts and the in-process connection handle.

mod account_contract;
mod asset_contract;
mod codec;
mod connection;

pub use account_contract::AccountContract;
pub use asset_contract::AssetContract;
pub use connection::InProcessShardConnection;
