//! Server configuration
//!
//! This module provides the server configuration type for the exchange's
//! two listeners: the HTTP façade and the WebSocket market-data feed.

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Server configuration for both listeners.
///
/// Each port is optional, allowing either listener to be disabled
/// (the exchange's `--ws` flag controls whether the WebSocket listener
/// starts at all).
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// // Both listeners
/// let config = ServerConfig::new("0.0.0.0", 8000, 8001);
///
/// // HTTP only
/// let config = ServerConfig::http_only("127.0.0.1", 8000);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Optional HTTP port
    pub http_port: Option<u16>,
    /// Optional WebSocket port
    pub websocket_port: Option<u16>,
}

impl ServerConfig {
    /// Create a new server config with both ports
    pub fn new(host: impl Into<String>, http: u16, ws: u16) -> Self {
        Self {
            host: host.into(),
            http_port: Some(http),
            websocket_port: Some(ws),
        }
    }

    /// Create a server config for HTTP only
    pub fn http_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: Some(port),
            websocket_port: None,
        }
    }

    /// Create a server config for WebSocket only
    pub fn websocket_only(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: None,
            websocket_port: Some(port),
        }
    }

    /// Get HTTP socket address
    pub fn http_addr(&self) -> Option<Result<SocketAddr>> {
        self.http_port.map(|p| self.parse_addr(p))
    }

    /// Get WebSocket socket address
    pub fn websocket_addr(&self) -> Option<Result<SocketAddr>> {
        self.websocket_port.map(|p| self.parse_addr(p))
    }

    /// Check if any servers are configured
    pub fn has_servers(&self) -> bool {
        self.http_port.is_some() || self.websocket_port.is_some()
    }

    /// Parse an address from host and port
    fn parse_addr(&self, port: u16) -> Result<SocketAddr> {
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 8000, 8001)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_new() {
        let config = ServerConfig::new("127.0.0.1", 8000, 8001);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.http_port, Some(8000));
        assert_eq!(config.websocket_port, Some(8001));
    }

    #[test]
    fn test_server_config_http_only() {
        let config = ServerConfig::http_only("127.0.0.1", 8000);
        assert_eq!(config.http_port, Some(8000));
        assert_eq!(config.websocket_port, None);
    }

    #[test]
    fn test_has_servers() {
        assert!(ServerConfig::http_only("127.0.0.1", 8000).has_servers());
        assert!(!ServerConfig {
            host: "127.0.0.1".to_string(),
            http_port: None,
            websocket_port: None,
        }
        .has_servers());
    }
}
