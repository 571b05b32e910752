//! cache_purge tool implementation.
//!
//! Trims the current generation to its newest entries.

use offgrid_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Keep only the newest N entries of the current generation.
    pub max_entries: usize,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// Entries left in the generation.
    pub remaining: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, tag: &str, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = cache.purge_oldest_entries(tag, params.max_entries).await?;
    let (remaining, _) = cache.generation_usage(tag).await?;
    tracing::info!(generation = tag, deleted, remaining, "purged store entries");

    let output = CachePurgeOutput { deleted, remaining };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output_text, stored};
    use offgrid_core::RequestKey;

    async fn seeded(urls: &[&str]) -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        for url in urls {
            cache
                .put_entry("v1", &RequestKey::get(*url), &stored(url, "body"))
                .await
                .unwrap();
        }
        cache
    }

    #[tokio::test]
    async fn test_purge_oldest() {
        let cache = seeded(&["https://app.test/a", "https://app.test/b", "https://app.test/c"]).await;

        let result = purge_impl(&cache, "v1", CachePurgeParams { max_entries: 1 }).await.unwrap();
        let output: CachePurgeOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.deleted, 2);
        assert_eq!(output.remaining, 1);
        assert_eq!(cache.list_entry_urls("v1").await.unwrap(), vec!["https://app.test/c".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_under_limit_is_noop() {
        let cache = seeded(&["https://app.test/a"]).await;

        let result = purge_impl(&cache, "v1", CachePurgeParams { max_entries: 10 }).await.unwrap();
        let output: CachePurgeOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.deleted, 0);
        assert_eq!(output.remaining, 1);
    }
}
