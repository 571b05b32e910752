//! Fakes shared by the engine tests.

use async_trait::async_trait;
use bytes::Bytes;
use offgrid_core::{CacheDb, Error, RequestKey, ResponseStore, StoredResponse};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::exchange::ProxyRequest;
use crate::fetch::{FetchResponse, Fetcher};

#[derive(Debug, Clone)]
pub struct Page {
    status: u16,
    body: Bytes,
}

pub fn page(status: u16, body: &str) -> Page {
    Page { status, body: Bytes::copy_from_slice(body.as_bytes()) }
}

pub fn stored_page(url: &str, body: &str) -> StoredResponse {
    StoredResponse {
        url: url.to_string(),
        status: 200,
        status_text: "OK".into(),
        headers: vec![("content-type".into(), "text/html".into())],
        body: body.as_bytes().to_vec(),
        stored_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
    }
}

/// In-memory network: URLs not served fail like an unreachable host.
#[derive(Default)]
pub struct FakeNetwork {
    pages: Mutex<HashMap<String, Page>>,
    calls: AtomicUsize,
    methods: Mutex<Vec<Method>>,
}

impl FakeNetwork {
    pub fn serve(&self, url: &str, page: Page) {
        self.pages.lock().unwrap().insert(url.to_string(), page);
    }

    pub fn go_offline(&self) {
        self.pages.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn methods(&self) -> Vec<Method> {
        self.methods.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.methods.lock().unwrap().push(request.method.clone());

        let page = self
            .pages
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("{}: connection refused", request.url)))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        Ok(FetchResponse {
            url: request.url.clone(),
            status: StatusCode::from_u16(page.status).unwrap(),
            bytes: page.body,
            headers,
        })
    }
}

/// `CacheDb` wrapper that counts entry reads and writes.
pub struct CountingStore {
    inner: CacheDb,
    pub lookups: AtomicUsize,
    pub stores: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, lookups: AtomicUsize::new(0), stores: AtomicUsize::new(0) }
    }

    pub fn touches(&self) -> usize {
        self.lookups.load(Ordering::SeqCst) + self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseStore for CountingStore {
    async fn open(&self, tag: &str) -> Result<(), Error> {
        self.inner.open(tag).await
    }

    async fn lookup(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(tag, key).await
    }

    async fn store(&self, tag: &str, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(tag, key, response).await
    }

    async fn generations(&self) -> Result<BTreeSet<String>, Error> {
        self.inner.generations().await
    }

    async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        self.inner.delete_generation(tag).await
    }
}

/// Store whose writes always fail and whose deletions fail for one tag.
pub struct StubbornStore {
    pub inner: CacheDb,
    pub undeletable: String,
}

#[async_trait]
impl ResponseStore for StubbornStore {
    async fn open(&self, tag: &str) -> Result<(), Error> {
        self.inner.open(tag).await
    }

    async fn lookup(&self, tag: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        self.inner.lookup(tag, key).await
    }

    async fn store(&self, _tag: &str, _key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        Err(Error::QuotaExceeded { used: 0, requested: response.body.len() as u64, quota: 0 })
    }

    async fn generations(&self) -> Result<BTreeSet<String>, Error> {
        self.inner.generations().await
    }

    async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        if tag == self.undeletable {
            return Err(Error::Storage(format!("{tag} is locked")));
        }
        self.inner.delete_generation(tag).await
    }
}
