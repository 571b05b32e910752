//! offgrid server entry point.
//!
//! Boots the engine (load config, open the store, install, activate) and then
//! serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use offgrid_client::{Engine, EngineConfig, FetchClient, FetchConfig};
use offgrid_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version_tag = %config.version_tag, origin = %config.origin, "Starting offgrid server on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await?
        .with_quota(config.store_quota_bytes);
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let engine = Arc::new(Engine::new(EngineConfig::from_app_config(&config)?, Arc::new(db.clone()), Arc::new(fetcher)));

    let older_controlling = db
        .list_generations()
        .await?
        .iter()
        .any(|tag| tag != engine.version_tag());

    let report = engine.install().await?;
    tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "install finished");

    if !engine.try_activate(older_controlling).await? {
        tracing::info!(state = %engine.state(), "waiting for skip_waiting before activating");
    }

    let handler = handler::OffgridServer::new(engine.clone(), db);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    let served = server.waiting().await;
    engine.flush_writes().await;
    served?;

    Ok(())
}
