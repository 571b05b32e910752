//! cache_get tool implementation.
//!
//! Looks up a stored response in the current generation by URL.

use offgrid_client::Engine;
use offgrid_client::fetch::resolve;
use offgrid_core::{Error, RequestKey};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the entry. Relative URLs resolve against the app origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    /// Store key (sha256 of method and URL).
    pub key: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
    pub body_len: usize,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &Engine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&engine.config().origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = RequestKey::get(url.as_str());

    let stored = engine
        .store()
        .get(&key)
        .await
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        url: stored.url,
        key: key.hash(),
        status: stored.status,
        status_text: stored.status_text,
        headers: stored.headers,
        stored_at: stored.stored_at,
        body_len: stored.body.len(),
        body_text: String::from_utf8(stored.body).ok(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
