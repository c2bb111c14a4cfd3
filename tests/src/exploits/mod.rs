//! # Protocol Misuse
//!
//! A driver that skips phases, forges certificates or replays ids, talking
//! to one shard directly. Every attempt must be refused without touching
//! committed state.

pub mod protocol_misuse;
