//! Route table (spec.md §6, plus the supplemented routes in SPEC_FULL.md §13).

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers;
use super::state::ExchangeState;

pub fn create_router(state: ExchangeState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/ob/api/", get(handlers::api_root))
        .route("/ob/api/heartbeat", get(handlers::heartbeat))
        .route("/ob/api/venues", get(handlers::list_venues))
        .route("/ob/api/venues/{venue}/heartbeat", get(handlers::venue_heartbeat))
        .route("/ob/api/venues/{venue}/stocks", get(handlers::list_stocks))
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}",
            get(handlers::stock_depth),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/quote",
            get(handlers::quote),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/scores",
            get(handlers::scoreboard),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/orders",
            post(handlers::admit_order),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/orders/{id}",
            get(handlers::order_status),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/orders/{id}",
            delete(handlers::cancel_order),
        )
        .route(
            "/ob/api/venues/{venue}/stocks/{stock}/orders/{id}/cancel",
            post(handlers::cancel_order),
        )
        .route(
            "/ob/api/venues/{venue}/accounts/{account}/orders",
            get(handlers::all_orders),
        )
        .route(
            "/ob/api/venues/{venue}/accounts/{account}/stocks/{stock}/orders",
            get(handlers::all_orders_for_stock),
        )
        .with_state(state)
}
