//! skip_waiting and engine_status tool implementations.

use offgrid_client::Engine;
use offgrid_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the skip_waiting tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipWaitingOutput {
    /// Whether this call moved the engine to active.
    pub activated: bool,
    /// Lifecycle state after the call.
    pub state: String,
}

/// Output from the engine_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EngineStatusOutput {
    pub version_tag: String,
    pub state: String,
    pub skip_waiting_requested: bool,
    /// Every generation present in the store.
    pub generations: Vec<String>,
    /// Entries in the current generation.
    pub entries: u64,
    /// Body bytes in the current generation.
    pub bytes: u64,
    pub quota_bytes: Option<u64>,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the skip_waiting tool.
pub async fn skip_waiting_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let activated = engine.skip_waiting().await?;
    to_result(&SkipWaitingOutput { activated, state: engine.state().to_string() })
}

/// Implementation of the engine_status tool.
pub async fn status_impl(engine: &Engine, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let generations = engine.generations().await?.into_iter().collect();
    let (entries, bytes) = db.generation_usage(engine.version_tag()).await?;

    to_result(&EngineStatusOutput {
        version_tag: engine.version_tag().to_string(),
        state: engine.state().to_string(),
        skip_waiting_requested: engine.skip_waiting_requested(),
        generations,
        entries,
        bytes,
        quota_bytes: db.quota_bytes(),
    })
}
