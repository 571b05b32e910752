//! Store abstraction handed to the engine.
//!
//! The engine never touches SQLite directly: it holds a [`StoreHandle`]
//! bound to the current version tag, backed by any [`ResponseStore`].
//! [`CacheDb`] is the durable implementation; tests substitute fakes.

use crate::Error;
use crate::cache::{CacheDb, RequestKey, StoredResponse};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Generation-aware key/response storage.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Create generation `tag` if absent.
    async fn open(&self, tag: &str) -> Result<(), Error>;

    /// Look up `key` in generation `tag`.
    async fn lookup(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error>;

    /// Write `response` under `key` in generation `tag`, replacing any prior entry.
    async fn store(&self, tag: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error>;

    /// Tags of every generation present.
    async fn generations(&self) -> Result<BTreeSet<String>, Error>;

    /// Delete generation `tag` in full. Returns false if it did not exist.
    async fn delete_generation(&self, tag: &str) -> Result<bool, Error>;
}

#[async_trait]
impl ResponseStore for CacheDb {
    async fn open(&self, tag: &str) -> Result<(), Error> {
        self.ensure_generation(tag).await
    }

    async fn lookup(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.get_entry(tag, key).await
    }

    async fn store(&self, tag: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.put_entry(tag, key, response).await
    }

    async fn generations(&self) -> Result<BTreeSet<String>, Error> {
        self.list_generations().await
    }

    async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        self.drop_generation(tag).await
    }
}

/// A store bound to one generation.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct StoreHandle {
    backend: Arc<dyn ResponseStore>,
    tag: String,
}

impl StoreHandle {
    /// Bind `backend` to generation `tag` without touching storage.
    pub fn new(backend: Arc<dyn ResponseStore>, tag: impl Into<String>) -> Self {
        Self { backend, tag: tag.into() }
    }

    /// Bind and create the generation if absent.
    pub async fn open(backend: Arc<dyn ResponseStore>, tag: impl Into<String>) -> Result<Self, Error> {
        let handle = Self::new(backend, tag);
        handle.backend.open(&handle.tag).await?;
        Ok(handle)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn backend(&self) -> &Arc<dyn ResponseStore> {
        &self.backend
    }

    /// Look up `key` in this generation.
    ///
    /// Never fails: a backend error is logged and reported as a miss.
    pub async fn get(&self, key: &RequestKey) -> Option<StoredResponse> {
        match self.backend.lookup(&self.tag, key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(generation = %self.tag, key = %key, error = %e, "store read failed; treating as miss");
                None
            }
        }
    }

    /// Write `response` under `key` in this generation.
    ///
    /// Callers treat failure as non-fatal.
    pub async fn put(&self, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.backend.store(&self.tag, key, response).await
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").field("tag", &self.tag).finish_non_exhaustive()
    }
}
