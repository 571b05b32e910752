//! Degraded responses when neither network nor a direct store hit works.
//!
//! The chain is consulted against the store only. Going back to the network
//! here could loop on the same failure.

use offgrid_core::{RequestKey, StoreHandle};

use crate::exchange::{ProxyResponse, ResponseSource};

/// Well-known substitute documents, in lookup order.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    root: RequestKey,
    offline: RequestKey,
}

impl FallbackChain {
    pub fn new(root: RequestKey, offline: RequestKey) -> Self {
        Self { root, offline }
    }

    /// Root document, then offline document.
    pub fn documents(&self) -> [&RequestKey; 2] {
        [&self.root, &self.offline]
    }

    /// Offline document only.
    pub fn offline(&self) -> [&RequestKey; 1] {
        [&self.offline]
    }
}

/// Return the first stored entry among `chain`, or the synthetic offline
/// response. Never fails.
pub async fn resolve(store: &StoreHandle, chain: &[&RequestKey]) -> ProxyResponse {
    for key in chain {
        if let Some(stored) = store.get(key).await {
            tracing::debug!(fallback = %key, "serving fallback document");
            return ProxyResponse::from_stored(stored, ResponseSource::Fallback);
        }
    }

    tracing::debug!(tried = chain.len(), "no fallback stored; answering offline");
    ProxyResponse::offline()
}
