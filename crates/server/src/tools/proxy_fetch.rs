//! proxy_fetch tool implementation.
//!
//! Hands one outbound request to the engine and returns whatever it decides:
//! the network response, a stored entry, a fallback document or the synthetic
//! offline response.

use offgrid_client::fetch::resolve;
use offgrid_client::{Engine, ProxyRequest, ProxyResponse, RequestMode};
use offgrid_core::Error;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input parameters for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// The URL to request. Relative URLs resolve against the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: Option<String>,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchOutput {
    /// How the engine classified the request.
    pub class: String,
    /// Where the response came from: network, store, fallback or synthetic.
    pub source: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub body_len: usize,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

impl ProxyFetchOutput {
    fn new(class: &str, response: ProxyResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        Self {
            class: class.to_string(),
            source: response.source.as_str().to_string(),
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            headers,
            content_type: response.content_type().map(str::to_string),
            body_len: response.body.len(),
            body_text: std::str::from_utf8(&response.body).ok().map(str::to_string),
        }
    }
}

fn build_request(engine: &Engine, params: &ProxyFetchParams) -> Result<ProxyRequest, Error> {
    let url = resolve(&engine.config().origin, &params.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let mut headers: Vec<(String, String)> = params.headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    if let Some(accept) = &params.accept {
        headers.push(("accept".into(), accept.clone()));
    }

    let mut request = ProxyRequest::from_parts(&params.method, url, &headers)?;
    if let Some(mode) = &params.mode {
        request = request.with_mode(mode.parse::<RequestMode>().map_err(Error::InvalidInput)?);
    }

    Ok(request)
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(engine: &Engine, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(engine, &params)?;
    let class = engine.classify(&request);
    let response = engine.handle(&request).await?;

    tracing::debug!(url = %request.url, class = class.as_str(), source = response.source.as_str(), "proxied");

    let output = ProxyFetchOutput::new(class.as_str(), response);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
