//! Entry point for the simulated exchange binary: parse CLI flags,
//! validate settings, wire the engine to the HTTP façade (and,
//! optionally, the WebSocket market-data feed), and run until shutdown.

use std::collections::HashMap;

use anyhow::Context;
use tracing::{error, info, warn};

use cli::Cli;
use config::ExchangeSettings;
use exchange_engine::{api::ExchangeState, AuthGate, Registry, SubscriptionHandler};
use server::{CombinedServer, ServerConfig, ServerExt};

fn settings_from_cli(cli: &Cli) -> ExchangeSettings {
    ExchangeSettings {
        maxbooks: cli.maxbooks,
        venue: cli.venue.clone(),
        symbol: cli.symbol.clone(),
        accounts_path: cli.accounts.clone(),
        http_port: cli.port,
        excess: cli.excess,
        websocket: cli.ws,
        ws_port: cli.wsport,
        log_format: cli.log_format.clone(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let settings = settings_from_cli(&cli);

    let log_format = observability::LogFormat::parse(&settings.log_format)
        .unwrap_or(observability::LogFormat::Pretty);
    observability::init_logging("obexchange", log_format)?;

    let report = settings.validate();
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "configuration warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!(%err, "configuration error");
        }
        anyhow::bail!("invalid configuration, refusing to start");
    }

    let accounts = match &settings.accounts_path {
        Some(path) => config::load_accounts_file(path)
            .with_context(|| format!("loading accounts file {}", path.display()))?,
        None => HashMap::new(),
    };
    let auth = AuthGate::new(accounts);

    let registry = Registry::new(settings.maxbooks);
    registry
        .ensure(&settings.venue, &settings.symbol)
        .await
        .context("creating the default venue/stock at startup")?;
    info!(venue = %settings.venue, symbol = %settings.symbol, "default book ready");

    let events = registry.events();
    let state = ExchangeState::new(registry, auth, settings.excess);
    let router = exchange_engine::api::create_router(state);

    let server_config = if settings.websocket {
        ServerConfig::new("0.0.0.0", settings.http_port, settings.ws_port)
    } else {
        ServerConfig::http_only("0.0.0.0", settings.http_port)
    };

    let combined = CombinedServer::with_http_router_and_ws_handler(
        server_config,
        router,
        SubscriptionHandler::new(events),
    );

    combined
        .validate_ports()
        .await
        .context("validating configured ports are available")?;

    info!(
        http_port = settings.http_port,
        websocket = settings.websocket,
        "starting obexchange"
    );

    combined.run_with_ctrl_c().await?;

    info!("obexchange shut down");
    Ok(())
}
