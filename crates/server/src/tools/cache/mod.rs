//! Store inspection tools.
//!
//! Operator access to the current generation of the SQLite store.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
