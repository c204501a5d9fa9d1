// This is the entry point of the moderation agent service.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (the external agent client)
// - `http/` = axum routes in front of the core service
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the router and serve it until Ctrl-C

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::ServiceConfig;
use crate::core::moderation::{AgentProvider, ModerationService};
use crate::infra::agent::TimewebAgentClient;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = ServiceConfig::from_env().context("Failed to read configuration")?;

    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if config.agent.api_key().is_none() {
        tracing::warn!("TIMEWEB_AGENT_API_KEY is not set, every report will be sent to review");
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let agent: Box<dyn AgentProvider> =
        Box::new(TimewebAgentClient::new().context("Failed to create agent HTTP client")?);
    let moderation = Arc::new(ModerationService::new(agent, config.agent.clone()));

    let app = http::router(moderation);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, agent_url = %config.agent.url, "Moderation agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Moderation agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
