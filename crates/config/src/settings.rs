//! Parsed exchange settings, independent of how they were sourced (CLI
//! flags today; nothing else currently feeds this type).

use std::path::PathBuf;

use crate::validator::{self, ValidationReport};

/// Fully-resolved settings the binary needs to stand up the exchange.
///
/// Mirrors the flat CLI flag set: no nesting, no defaults-merging of
/// multiple config layers, since there is only one source (the CLI).
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    /// Maximum total book count across all venues. `0` disables the cap.
    pub maxbooks: u32,
    /// Default venue, created eagerly at startup alongside `symbol`.
    pub venue: String,
    /// Default symbol, created eagerly at startup.
    pub symbol: String,
    /// Path to the JSON accounts file. `None` means open (no-auth) mode.
    pub accounts_path: Option<PathBuf>,
    /// Port the HTTP façade listens on.
    pub http_port: u16,
    /// Enables the `/accounts/{a}/orders` and `.../stocks/{s}/orders` routes.
    pub excess: bool,
    /// Enables the WebSocket market-data fan-out.
    pub websocket: bool,
    /// Port the WebSocket server listens on, when `websocket` is set.
    pub ws_port: u16,
    /// Log output format name (`pretty`, `json`, `compact`).
    pub log_format: String,
}

impl ExchangeSettings {
    /// Run `ExchangeSettings`-specific validation, producing a report of
    /// fatal errors and non-fatal warnings rather than failing fast on
    /// the first problem — a caller decides whether warnings should
    /// block startup.
    pub fn validate(&self) -> ValidationReport {
        validator::validate_settings(self)
    }
}
