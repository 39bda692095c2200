//! Twin API server with graceful shutdown

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use twin_reveal::DEFAULT_REVEAL_CAPACITY;

use crate::error::ApiError;
use crate::middleware::{
    body_limit_layer, cors_layer, request_id_middleware, timeout_layer, tracing_middleware,
};
use crate::routes::api_router;
use crate::state::AppState;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server address
    pub addr: SocketAddr,
    /// Request timeout
    pub timeout: Duration,
    /// Max request body size (bytes)
    pub max_body_size: usize,
    /// Most reveal requests kept in memory
    pub max_reveal_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            max_reveal_requests: DEFAULT_REVEAL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("TWIN_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let timeout_secs: u64 = lookup("TWIN_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .unwrap_or(30);

        let max_reveal_requests: usize = lookup("TWIN_REVEAL_MAX_REQUESTS")
            .and_then(|n| n.parse().ok())
            .unwrap_or(DEFAULT_REVEAL_CAPACITY);

        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            timeout: Duration::from_secs(timeout_secs),
            max_reveal_requests,
            ..Default::default()
        }
    }
}

/// Twin API Server
pub struct TwinServer {
    config: ServerConfig,
    app_state: AppState,
}

impl TwinServer {
    pub fn new(config: ServerConfig, app_state: AppState) -> Self {
        Self { config, app_state }
    }

    /// Router with the full middleware stack
    pub fn router(&self) -> Router {
        api_router(self.app_state.clone())
            // Body size limit
            .layer(body_limit_layer(self.config.max_body_size))
            // Timeout
            .layer(timeout_layer(self.config.timeout))
            // CORS
            .layer(cors_layer())
            // Tracing
            .layer(middleware::from_fn(tracing_middleware))
            // Request ID (outermost, so the tracing span sees it)
            .layer(middleware::from_fn(request_id_middleware))
    }

    /// Run the server with graceful shutdown
    pub async fn run(self) -> Result<(), ApiError> {
        let app = self.router();
        let addr = self.config.addr;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::Internal(format!("Bind to {} failed: {}", addr, e)))?;
        tracing::info!("Twin API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Initialize tracing subscriber
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,twin_api=debug,twin_anchor=debug,tower_http=debug")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.max_reveal_requests, DEFAULT_REVEAL_CAPACITY);
    }

    #[test]
    fn test_server_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TWIN_PORT", "9191"),
            ("TWIN_TIMEOUT_SECS", "nope"),
            ("TWIN_REVEAL_MAX_REQUESTS", "250"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.addr.port(), 9191);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_reveal_requests, 250);
    }
}
