//! Request and response descriptors exchanged with the host.

use bytes::Bytes;
use offgrid_core::{Error, RequestKey, StoredResponse};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::fetch::FetchResponse;

/// Body of the synthetic response returned when nothing else is available.
pub const OFFLINE_BODY: &str = "Offline";

/// How the request was initiated by the client page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

impl FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(Self::Navigate),
            "same-origin" => Ok(Self::SameOrigin),
            "no-cors" => Ok(Self::NoCors),
            "cors" => Ok(Self::Cors),
            other => Err(format!("unknown request mode: {other}")),
        }
    }
}

/// An intercepted outbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
}

impl ProxyRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), mode: RequestMode::default() }
    }

    /// A plain GET, as issued for preloading.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// A top-level document load.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    /// Build a request from untyped parts as supplied by a host.
    pub fn from_parts(method: &str, url: Url, headers: &[(String, String)]) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))?;

        let mut request = Self::new(method, url);
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidInput(format!("invalid header name: {name}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| Error::InvalidInput(format!("invalid value for header {name}")))?;
            request.headers.append(header_name, header_value);
        }

        Ok(request)
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_accept(self, accept: &'static str) -> Self {
        self.with_header(header::ACCEPT, HeaderValue::from_static(accept))
    }

    /// The Accept header, or empty when absent or not valid text.
    pub fn accept(&self) -> &str {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Whether the request negotiates for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.accept().contains("text/html")
    }

    /// Store identity of this request. Only meaningful for GET.
    ///
    /// The fragment never reaches the server, so it is not part of the key.
    pub fn key(&self) -> RequestKey {
        if self.url.fragment().is_none() {
            return RequestKey::get(self.url.as_str());
        }
        let mut url = self.url.clone();
        url.set_fragment(None);
        RequestKey::get(url.as_str())
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    /// Direct store hit for the request's own key.
    Store,
    /// Substitute document from the fallback chain.
    Fallback,
    /// Fixed offline response.
    Synthetic,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Store => "store",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Synthetic => "synthetic",
        }
    }
}

/// The response handed back to the host.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl ProxyResponse {
    /// The terminal response: 503 with a fixed plain-text body.
    pub fn offline() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            status_text: OFFLINE_BODY.to_string(),
            headers,
            body: Bytes::from_static(OFFLINE_BODY.as_bytes()),
            source: ResponseSource::Synthetic,
        }
    }

    /// Rebuild a response from a stored entry.
    ///
    /// Header pairs that are no longer valid HTTP are skipped.
    pub fn from_stored(stored: StoredResponse, source: ResponseSource) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Self {
            status: StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK),
            status_text: stored.status_text,
            headers,
            body: Bytes::from(stored.body),
            source,
        }
    }

    /// Snapshot this response for storage under `url`.
    pub fn to_stored(&self, url: &Url) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        StoredResponse {
            url: url.to_string(),
            status: self.status.as_u16(),
            status_text: self.status_text.clone(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl From<FetchResponse> for ProxyResponse {
    fn from(response: FetchResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status.canonical_reason().unwrap_or_default().to_string(),
            headers: response.headers,
            body: response.bytes,
            source: ResponseSource::Network,
        }
    }
}
