//! Twin Server - Standalone entry point for the Twin Anchor API
//!
//! Thin wrapper around `twin-api`: reads configuration from the
//! environment, resolves ledger handles once and serves until shutdown.

use anyhow::{Context, Result};
use twin_anchor::{AnchorConfig, LedgerHandles};
use twin_api::{AppState, JwtAuth, ServerConfig, TwinServer};

#[tokio::main]
async fn main() -> Result<()> {
    twin_api::server::init_tracing();

    tracing::info!("Starting Twin Anchor server");

    // Platform compatibility: map $PORT to TWIN_PORT
    if let Ok(port) = std::env::var("PORT") {
        if std::env::var("TWIN_PORT").is_err() {
            tracing::info!("Mapping PORT {} to TWIN_PORT", port);
            std::env::set_var("TWIN_PORT", port);
        }
    }

    let anchor_config = AnchorConfig::from_env().map_err(|e| {
        tracing::error!("Invalid anchoring configuration: {}", e);
        e
    })?;
    let handles = LedgerHandles::from_config(&anchor_config)
        .context("Failed to initialize ledger handles")?;

    let jwt_auth = JwtAuth::from_env().map_err(|e| {
        tracing::error!("Authentication is not configured: {}", e);
        e
    })?;

    let server_config = ServerConfig::from_env();
    let state = AppState::from_handles(&handles, jwt_auth, server_config.max_reveal_requests);
    let server = TwinServer::new(server_config, state);

    server.run().await.map_err(|e| {
        tracing::error!("Server error during execution: {}", e);
        e
    })?;

    Ok(())
}
