//! Retrieval strategies.
//!
//! - Network-first (documents, app bundle): freshness wins; the store is the
//!   safety net.
//! - Cache-first (everything else): availability wins; the network only
//!   fills misses.

use offgrid_core::{RequestKey, StoreHandle, StoredResponse};
use reqwest::StatusCode;
use std::sync::{Mutex, PoisonError};
use tokio::task::JoinSet;

use super::classify::RequestClass;
use super::fallback::{FallbackChain, resolve};
use crate::exchange::{ProxyRequest, ProxyResponse, ResponseSource};
use crate::fetch::Fetcher;

/// Detached write-through tasks.
///
/// The response path only spawns into this set and never waits on it;
/// [`BackgroundWrites::flush`] exists for shutdown and tests.
#[derive(Default)]
pub struct BackgroundWrites {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundWrites {
    /// Spawn a best-effort write of `response` under `key`.
    pub fn spawn_put(&self, store: StoreHandle, key: RequestKey, response: StoredResponse) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = store.put(&key, &response).await {
                tracing::warn!(key = %key, error = %e, "background write-through failed");
            }
        });
    }

    /// Number of writes spawned but not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every write spawned so far.
    pub async fn flush(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "write-through task aborted");
            }
        }
    }
}

/// Everything a strategy needs besides the request.
pub struct StrategyContext<'a> {
    pub store: &'a StoreHandle,
    pub fetcher: &'a dyn Fetcher,
    pub fallback: &'a FallbackChain,
    pub writes: &'a BackgroundWrites,
}

/// Partial responses are never written to the store.
fn is_storable(response: &ProxyResponse) -> bool {
    response.status != StatusCode::PARTIAL_CONTENT
}

/// Fetch first; on success write through in the background and return the
/// live response. On failure serve the request's own stored entry, then the
/// document chain (root, offline), then the synthetic response.
pub async fn network_first(request: &ProxyRequest, class: RequestClass, ctx: &StrategyContext<'_>) -> ProxyResponse {
    let key = request.key();

    match ctx.fetcher.fetch(request).await {
        Ok(fetched) => {
            let response = ProxyResponse::from(fetched);
            if is_storable(&response) {
                ctx.writes.spawn_put(ctx.store.clone(), key, response.to_stored(&request.url));
            }
            response
        }
        Err(e) => {
            if e.is_transient() {
                tracing::debug!(url = %request.url, ?class, error = %e, "network-first fetch failed");
            } else {
                tracing::warn!(url = %request.url, ?class, error = %e, "network-first fetch failed");
            }

            if let Some(stored) = ctx.store.get(&key).await {
                return ProxyResponse::from_stored(stored, ResponseSource::Store);
            }

            resolve(ctx.store, &ctx.fallback.documents()).await
        }
    }
}

/// Serve from the store; fill misses from the network with an awaited,
/// best-effort write.
pub async fn cache_first(request: &ProxyRequest, ctx: &StrategyContext<'_>) -> ProxyResponse {
    let key = request.key();

    if let Some(stored) = ctx.store.get(&key).await {
        tracing::debug!(url = %request.url, "cache-first hit");
        return ProxyResponse::from_stored(stored, ResponseSource::Store);
    }

    match ctx.fetcher.fetch(request).await {
        Ok(fetched) => {
            let response = ProxyResponse::from(fetched);
            if is_storable(&response)
                && let Err(e) = ctx.store.put(&key, &response.to_stored(&request.url)).await
            {
                tracing::warn!(key = %key, error = %e, "write-through failed");
            }
            response
        }
        Err(e) => {
            if e.is_transient() {
                tracing::debug!(url = %request.url, error = %e, "cache-first fetch failed");
            } else {
                tracing::warn!(url = %request.url, error = %e, "cache-first fetch failed");
            }

            if request.accepts_html() {
                resolve(ctx.store, &ctx.fallback.offline()).await
            } else {
                ProxyResponse::offline()
            }
        }
    }
}
