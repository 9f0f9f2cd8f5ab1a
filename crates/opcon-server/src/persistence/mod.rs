//! Persistence layer for the operator console.
//!
//! SQLite-backed storage for the acceptance set, the last finalized
//! survey polygon (both as fixed-key JSON documents), and the last
//! uploaded per-vehicle missions. Read once at startup, rewritten on
//! every mutation.

pub mod db;
pub mod kv;
pub mod missions;

pub use db::{init_database, Database};
