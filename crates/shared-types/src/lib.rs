//! # Shared Types Crate
//!
//! Types exchanged between the transaction coordinator and the shard ledger
//! contracts.
//!
//! ## Design Principles
//!
//! - **Opaque certificates**: shards only ever see each other's digests
//!   ([`HashPair`]), never raw business data.
//! - **One correlation payload**: everything a shard needs to recognise a
//!   transaction it already started travels in the [`DependencyMap`].
//! - **Connectivity is a port**: the coordinator talks to shards only through
//!   [`ShardInvoker`]; how the bytes move is somebody else's problem.

pub mod certificate;
pub mod dependency_map;
pub mod entities;
pub mod errors;
pub mod ipc;

pub use certificate::{HashPair, CERTIFICATE_LEN};
pub use dependency_map::{keys, DependencyMap};
pub use entities::*;
pub use errors::*;
pub use ipc::*;
