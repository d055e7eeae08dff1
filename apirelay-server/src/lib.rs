// Copyright 2025 Apirelay (https://github.com/apirelay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

pub mod config;
pub mod mcp;
pub mod services;
pub mod state;
pub mod tools;

use anyhow::Result;
use config::ServerConfig;
use mcp::handlers::McpHandler;
use mcp::server::McpServer;
use mcp::transport::StdioTransport;
use state::AppState;
use std::sync::Arc;
use tools::registry::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build the shared state and register every tool.
pub fn build_registry(config: &ServerConfig) -> Result<(Arc<AppState>, Arc<ToolRegistry>)> {
    let state = Arc::new(AppState::new(config.gateway.clone())?);
    let registry = Arc::new(ToolRegistry::new());
    services::register_all(&registry, state.clone())
        .map_err(|e| anyhow::anyhow!("tool registration failed: {e}"))?;
    Ok((state, registry))
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // RUST_LOG wins over the configured filter. Diagnostics go to stderr;
    // stdout carries the MCP framing.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("starting apirelay MCP server");
    config.validate()?;
    tracing::info!(
        timeout_secs = config.gateway.default_timeout_secs,
        health_check = config.gateway.enable_health_check,
        "gateway settings loaded"
    );

    let (state, registry) = build_registry(&config)?;
    tracing::info!(tools = registry.list().len(), "tool registry ready");

    if config.logging.startup_health_check && config.gateway.enable_health_check {
        tracing::info!("running startup health check");
        let report = services::system::health_check(&state).await;
        tracing::info!("health check:\n{report}");
    }

    let handler = Arc::new(McpHandler::new(registry));
    let server = McpServer::new(handler);
    let mut transport = StdioTransport::new();
    server.serve(&mut transport).await?;

    tracing::info!("server shutting down");
    Ok(())
}
