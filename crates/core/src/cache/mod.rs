//! SQLite-backed, generation-tagged response store.
//!
//! This module provides the durable half of the engine:
//!
//! - Entries addressed by request identity (SHA-256 of method + URL)
//! - One generation per deployed version tag, deleted wholesale at cutover
//! - Automatic schema migrations
//! - WAL mode so request tasks can read while another writes

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use key::RequestKey;
