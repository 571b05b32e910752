//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the engine and the store.
use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::lifecycle::{skip_waiting_impl, status_impl};
use crate::tools::proxy_fetch::{ProxyFetchParams, fetch_impl};

use offgrid_client::Engine;
use offgrid_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for offgrid.
#[derive(Clone)]
pub struct OffgridServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<Engine>,
    db: CacheDb,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffgridServer {
    /// Create a new server handler around an installed engine.
    pub fn new(engine: Arc<Engine>, db: CacheDb) -> Self {
        Self { tool_router: Self::tool_router(), engine, db }
    }

    /// Route one outbound request through the offline engine.
    #[tool(
        description = "Fetch a URL through the offline cache. Documents and the app bundle are network-first, other assets cache-first; failures fall back to stored documents or a 503 Offline response."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Activate the installed version now, deleting every older store generation.")]
    async fn skip_waiting(&self) -> Result<CallToolResult, McpError> {
        skip_waiting_impl(&self.engine).await
    }

    #[tool(description = "Report the version tag, lifecycle state and store generations.")]
    async fn engine_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine, &self.db).await
    }

    /// Retrieve a stored response by URL.
    #[tool(description = "Look up a stored response in the current generation by URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    /// Trim the current generation to its newest entries.
    #[tool(description = "Keep only the newest N entries of the current store generation.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.db, self.engine.version_tag(), params.0).await
    }
}

impl ServerHandler for OffgridServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offgrid".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_engine;

    #[tokio::test]
    async fn test_all_tools_listed() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let server = OffgridServer::new(offline_engine(db.clone()).await, db);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_get", "cache_purge", "engine_status", "proxy_fetch", "skip_waiting"]);
    }
}
