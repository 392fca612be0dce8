use std::path::PathBuf;

use clap::Parser;

/// Stockfighter-compatible simulated exchange.
#[derive(Parser, Debug)]
#[command(name = "obexchange")]
#[command(about = "A self-contained simulated stock exchange with a Stockfighter-compatible HTTP API")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Maximum total book count across all venues. 0 disables the cap.
    #[arg(short = 'b', long, default_value_t = 0)]
    pub maxbooks: u32,

    /// Default venue, created eagerly at startup.
    #[arg(short = 'v', long, default_value = "TESTEX")]
    pub venue: String,

    /// Default symbol/stock, created eagerly at startup.
    #[arg(short = 's', long, visible_alias = "stock", default_value = "FOOBAR")]
    pub symbol: String,

    /// Path to the JSON accounts file (account -> API key). Omit for open (no-auth) mode.
    #[arg(short = 'a', long)]
    pub accounts: Option<PathBuf>,

    /// HTTP port.
    #[arg(short = 'p', long, default_value_t = 8000)]
    pub port: u16,

    /// Enable the excess-response endpoints (per-account all-orders reads).
    #[arg(short = 'e', long, visible_alias = "extra")]
    pub excess: bool,

    /// Enable the WebSocket market-data fan-out.
    #[arg(short = 'w', long, visible_alias = "websocket")]
    pub ws: bool,

    /// WebSocket port, used when `--ws` is set.
    #[arg(long, default_value_t = 8001)]
    pub wsport: u16,

    /// Log output format: pretty, json, or compact.
    #[arg(long, default_value = "pretty")]
    pub log_format: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
