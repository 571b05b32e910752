//! Core types and shared functionality for offgrid.
//!
//! This crate provides:
//! - Generation-tagged response store with SQLite backend
//! - The `ResponseStore` seam and `StoreHandle` the engine works through
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod store;

pub use cache::{CacheDb, RequestKey, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{ResponseStore, StoreHandle};
