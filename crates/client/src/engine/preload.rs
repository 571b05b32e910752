//! Install-time preloading of the manifest.

use futures_util::future::join_all;
use offgrid_core::{Error, StoreHandle};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::exchange::{ProxyRequest, ProxyResponse};
use crate::fetch::Fetcher;

/// A manifest entry that could not be preloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of one preload pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreloadReport {
    /// Entries written to the store, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<PreloadFailure>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

async fn preload_one(url: &Url, store: &StoreHandle, fetcher: &dyn Fetcher) -> Result<(), Error> {
    let request = ProxyRequest::get(url.clone());
    let response = ProxyResponse::from(fetcher.fetch(&request).await?);

    if !response.status.is_success() {
        return Err(Error::HttpError(format!("status {}", response.status.as_u16())));
    }

    store.put(&request.key(), &response.to_stored(url)).await
}

/// Fetch every manifest entry concurrently and write it to `store`.
///
/// Only successful (2xx) responses are stored. A failing entry is logged and
/// reported; it never stops the others and never fails the pass.
pub async fn preload(manifest: &[Url], store: &StoreHandle, fetcher: &dyn Fetcher) -> PreloadReport {
    let outcomes = join_all(manifest.iter().map(|url| async move { (url, preload_one(url, store, fetcher).await) })).await;

    let mut report = PreloadReport::default();
    for (url, outcome) in outcomes {
        match outcome {
            Ok(()) => report.cached.push(url.to_string()),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to preload manifest entry");
                report.failed.push(PreloadFailure { url: url.to_string(), reason: e.to_string() });
            }
        }
    }

    tracing::info!(
        generation = store.tag(),
        cached = report.cached.len(),
        failed = report.failed.len(),
        "preload finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeNetwork, page};
    use offgrid_core::CacheDb;
    use std::sync::Arc;

    fn manifest(paths: &[&str]) -> Vec<Url> {
        paths
            .iter()
            .map(|p| Url::parse(&format!("https://app.test/{p}")).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_preload_all_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreHandle::open(Arc::new(db.clone()), "v1").await.unwrap();
        let network = FakeNetwork::default();
        let urls = manifest(&["index.html", "app.js", "offline.html"]);
        for url in &urls {
            network.serve(url.as_str(), page(200, url.path()));
        }

        let report = preload(&urls, &store, &network).await;
        assert!(report.is_complete());
        assert_eq!(report.cached.len(), 3);
        assert_eq!(db.generation_usage("v1").await.unwrap().0, 3);
    }

    #[tokio::test]
    async fn test_preload_twice_keeps_one_entry_per_item() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreHandle::open(Arc::new(db.clone()), "v1").await.unwrap();
        let network = FakeNetwork::default();
        let urls = manifest(&["index.html", "Parts.csv"]);

        network.serve("https://app.test/index.html", page(200, "home v1"));
        network.serve("https://app.test/Parts.csv", page(200, "bolt,4"));
        preload(&urls, &store, &network).await;

        network.serve("https://app.test/index.html", page(200, "home v2"));
        preload(&urls, &store, &network).await;

        let mut stored = db.list_entry_urls("v1").await.unwrap();
        stored.sort();
        assert_eq!(stored, vec!["https://app.test/Parts.csv".to_string(), "https://app.test/index.html".to_string()]);

        let index = store.get(&ProxyRequest::get(urls[0].clone()).key()).await.unwrap();
        assert_eq!(index.body, b"home v2".to_vec());
    }

    #[tokio::test]
    async fn test_preload_tolerates_failures() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = StoreHandle::open(Arc::new(db.clone()), "v1").await.unwrap();
        let network = FakeNetwork::default();
        let urls = manifest(&["index.html", "icon-512.png", "manifest.json", "offline.html"]);

        network.serve("https://app.test/index.html", page(200, "home"));
        network.serve("https://app.test/manifest.json", page(404, "missing"));
        network.serve("https://app.test/offline.html", page(200, "offline"));

        let report = preload(&urls, &store, &network).await;
        assert_eq!(report.cached, vec!["https://app.test/index.html".to_string(), "https://app.test/offline.html".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().any(|f| f.url.ends_with("manifest.json") && f.reason.contains("404")));

        for cached in &report.cached {
            let key = ProxyRequest::get(Url::parse(cached).unwrap()).key();
            assert!(store.get(&key).await.is_some());
        }
    }
}
