//! Generic server infrastructure for the exchange binary.
//!
// Allow large error types - WebSocket errors are unavoidably large
#![allow(clippy::result_large_err)]
//!
//! # Architecture
//!
//! Both servers implement the [`Server`] trait, which provides a consistent
//! interface for running and monitoring servers. The [`ServerExt`] trait
//! provides convenience methods like `spawn()` and `run_with_ctrl_c()`.
//!
//! Shutdown coordination uses `CancellationToken` from `tokio_util`, allowing
//! hierarchical shutdown where cancelling a parent token automatically cancels
//! all child tokens.
//!
//! # Quick Start
//!
//! ```ignore
//! use server::{CombinedServer, ServerConfig, Server, ServerExt};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::new("0.0.0.0", 8000, 8001);
//!     let server = CombinedServer::with_http_router(config, my_router);
//!
//!     server.run_with_ctrl_c().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`] - Server configuration
//! - [`traits`] - `Server` and `ServerExt` traits
//! - [`http`] - HTTP server using Axum
//! - [`websocket`] - WebSocket server using Tungstenite
//! - [`health`] - Health check endpoint
//! - [`shutdown`] - Graceful shutdown utilities

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// Core modules
pub mod config;
pub mod error;
pub mod shutdown;
pub mod traits;

// Server implementations
pub mod health;
pub mod http;
pub mod port_validator;
pub mod websocket;

// Re-exports for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use health::{HealthState, HealthStatus};
pub use http::HttpServer;
pub use port_validator::validate_ports_available;
pub use shutdown::{shutdown_signal, ShutdownController};
pub use traits::{Server, ServerExt};
pub use websocket::{ConnectionId, FeedSender, MessageHandler, WebSocketServer};

/// Combined server that runs the HTTP façade and the WebSocket feed
/// under one shutdown token.
///
/// # Example
///
/// ```ignore
/// use server::{CombinedServer, ServerConfig, Server, ServerExt};
///
/// let config = ServerConfig::new("0.0.0.0", 8000, 8001);
/// let server = CombinedServer::with_http_router(config, router);
///
/// // Option 1: Run with Ctrl+C handling
/// server.run_with_ctrl_c().await?;
///
/// // Option 2: Manual control
/// let (handle, token) = server.spawn();
/// // ... later ...
/// token.cancel();
/// handle.await??;
/// ```
pub struct CombinedServer {
    name: String,
    config: ServerConfig,
    http_server: Option<HttpServer>,
    ws_server: Option<WebSocketServer>,
}

impl CombinedServer {
    /// Create a new combined server with a custom HTTP router. The
    /// WebSocket listener starts only if `config.websocket_port` is set.
    pub fn with_http_router(config: ServerConfig, http_router: axum::Router) -> Self {
        let http_server = config
            .http_port
            .map(|_| HttpServer::new(config.clone(), http_router));
        let ws_server = config.websocket_port.map(|_| WebSocketServer::new(config.clone()));

        Self {
            name: "obexchange".into(),
            config,
            http_server,
            ws_server,
        }
    }

    /// Like [`Self::with_http_router`], but the WebSocket listener (when
    /// `config.websocket_port` is set) uses a caller-supplied handler
    /// instead of the default echo handler.
    pub fn with_http_router_and_ws_handler<H: crate::websocket::MessageHandler + 'static>(
        config: ServerConfig,
        http_router: axum::Router,
        ws_handler: H,
    ) -> Self {
        let http_server = config
            .http_port
            .map(|_| HttpServer::new(config.clone(), http_router));
        let ws_server = config
            .websocket_port
            .map(|_| WebSocketServer::with_handler(config.clone(), ws_handler));

        Self {
            name: "obexchange".into(),
            config,
            http_server,
            ws_server,
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Validate that all configured ports are available
    pub async fn validate_ports(&self) -> Result<()> {
        validate_ports_available(&self.config).await
    }
}

#[async_trait::async_trait]
impl Server for CombinedServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> Option<std::net::SocketAddr> {
        self.http_server
            .as_ref()
            .and_then(|s| s.address())
            .or_else(|| self.ws_server.as_ref().and_then(|s| s.address()))
    }

    fn is_running(&self) -> bool {
        self.http_server.as_ref().map(|s| s.is_running()).unwrap_or(false)
            || self.ws_server.as_ref().map(|s| s.is_running()).unwrap_or(false)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        info!(server = %self.name, "Starting combined server...");

        let mut handles: Vec<tokio::task::JoinHandle<Result<()>>> = Vec::new();

        if let Some(ref http) = self.http_server {
            let http = http.clone();
            let token = shutdown_token.child_token();
            if let Some(port) = self.config.http_port {
                info!(port, "Starting HTTP server");
            }
            handles.push(tokio::spawn(async move { http.run(token).await }));
        }

        if let Some(ref ws) = self.ws_server {
            let ws = ws.clone();
            let token = shutdown_token.child_token();
            if let Some(port) = self.config.websocket_port {
                info!(port, "Starting WebSocket server");
            }
            handles.push(tokio::spawn(async move { ws.run(token).await }));
        }

        if handles.is_empty() {
            warn!("No servers configured to start");
            return Ok(());
        }

        info!(server = %self.name, "All server components started");

        tokio::select! {
            _ = shutdown_token.cancelled() => {
                info!("Shutdown signal received");
            }
            result = wait_for_first_completion(&mut handles) => {
                match result {
                    Some(Ok(Ok(()))) => {
                        warn!("A server exited unexpectedly (but successfully)");
                    }
                    Some(Ok(Err(e))) => {
                        error!(%e, "A server exited with error");
                    }
                    Some(Err(e)) => {
                        error!(%e, "A server task panicked");
                    }
                    None => {}
                }
                shutdown_token.cancel();
            }
        }

        info!("Waiting for all servers to shut down...");
        let shutdown_timeout = std::time::Duration::from_secs(30);

        match tokio::time::timeout(shutdown_timeout, wait_for_all_completion(handles)).await {
            Ok(results) => {
                let errors: Vec<_> = results
                    .into_iter()
                    .filter_map(|r| match r {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(e.to_string()),
                        Err(e) => Some(format!("Task panicked: {}", e)),
                    })
                    .collect();

                if errors.is_empty() {
                    info!(server = %self.name, "All servers shut down successfully");
                } else {
                    warn!(?errors, "Some servers had errors during shutdown");
                }
            }
            Err(_) => {
                warn!("Timed out waiting for servers to shut down");
            }
        }

        info!(server = %self.name, "Combined server shutdown complete");
        Ok(())
    }
}

/// Wait for the first handle to complete
async fn wait_for_first_completion(
    handles: &mut [tokio::task::JoinHandle<Result<()>>],
) -> Option<std::result::Result<Result<()>, tokio::task::JoinError>> {
    if handles.is_empty() {
        return None;
    }

    let (result, _index, _remaining) =
        futures::future::select_all(handles.iter_mut().map(Box::pin)).await;

    Some(result)
}

/// Wait for all handles to complete
async fn wait_for_all_completion(
    handles: Vec<tokio::task::JoinHandle<Result<()>>>,
) -> Vec<std::result::Result<Result<()>, tokio::task::JoinError>> {
    futures::future::join_all(handles).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_server_config() {
        let config = ServerConfig::new("127.0.0.1", 8000, 8001);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.http_port, Some(8000));
        assert_eq!(config.websocket_port, Some(8001));
        assert!(config.has_servers());
    }

    #[tokio::test]
    async fn test_combined_server_shutdown() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            http_port: Some(0),
            websocket_port: Some(0),
        };

        let router = axum::Router::new();
        let server = CombinedServer::with_http_router(config, router);
        let (handle, token) = server.spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;

        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), handle).await;

        assert!(result.is_ok(), "Server should shutdown within timeout");
    }
}
