use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{FALLBACK_HEADER, PRIMARY_HEADER};
use crate::book::AdmissionRequest;
use crate::order::{OrderType, Side};

use super::error::ApiError;
use super::state::ExchangeState;

fn api_key<'a>(headers: &'a HeaderMap) -> Option<&'a str> {
    headers
        .get(PRIMARY_HEADER)
        .or_else(|| headers.get(FALLBACK_HEADER))
        .and_then(|v| v.to_str().ok())
}

fn ok(value: Value) -> Json<Value> {
    let mut map = match value {
        Value::Object(m) => m,
        other => {
            let mut m = serde_json::Map::new();
            m.insert("value".to_string(), other);
            m
        }
    };
    map.insert("ok".to_string(), Value::Bool(true));
    Json(Value::Object(map))
}

pub async fn home() -> impl IntoResponse {
    "a simulated stock exchange\n"
}

pub async fn api_root() -> impl IntoResponse {
    "this is the order book API\n"
}

pub async fn heartbeat() -> impl IntoResponse {
    ok(json!({"error": ""}))
}

pub async fn list_venues(State(state): State<ExchangeState>) -> impl IntoResponse {
    let venues = state.registry.venues().await;
    let venues: Vec<Value> = venues
        .into_iter()
        .map(|v| json!({"venue": v.clone(), "name": v, "state": "open"}))
        .collect();
    ok(json!({"venues": venues}))
}

pub async fn venue_heartbeat(
    State(state): State<ExchangeState>,
    Path(venue): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.registry.has_venue(&venue).await {
        return Err(ApiError::NoSuchVenue);
    }
    Ok(ok(json!({"venue": venue})))
}

pub async fn list_stocks(
    State(state): State<ExchangeState>,
    Path(venue): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.registry.has_venue(&venue).await {
        return Err(ApiError::NoSuchVenue);
    }
    let stocks = state.registry.stocks(&venue).await;
    let symbols: Vec<Value> = stocks
        .into_iter()
        .map(|s| json!({"name": s.clone(), "symbol": s}))
        .collect();
    Ok(ok(json!({"symbols": symbols})))
}

pub async fn stock_depth(
    State(state): State<ExchangeState>,
    Path((venue, stock)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.registry.ensure(&venue, &stock).await?;
    let depth = book.read().await.get_book();
    Ok(ok(serde_json::to_value(depth).map_err(|e| ApiError::Internal(e.to_string()))?))
}

pub async fn quote(
    State(state): State<ExchangeState>,
    Path((venue, stock)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.registry.ensure(&venue, &stock).await?;
    let quote = book.read().await.get_quote();
    Ok(ok(serde_json::to_value(quote).map_err(|e| ApiError::Internal(e.to_string()))?))
}

struct ParsedAdmission {
    account: String,
    side: Side,
    order_type: OrderType,
    qty: u64,
    price: Option<u64>,
}

fn parse_admission(body: &Value, venue: &str, stock: &str) -> Result<ParsedAdmission, ApiError> {
    let obj = body.as_object().ok_or_else(|| ApiError::BadJson("expected a JSON object".into()))?;

    if let Some(v) = obj.get("venue") {
        let v = v.as_str().ok_or_else(|| ApiError::BadType("venue".into()))?;
        if v != venue {
            return Err(ApiError::UrlMismatch);
        }
    }
    if let Some(v) = obj.get("stock").or_else(|| obj.get("symbol")) {
        let v = v.as_str().ok_or_else(|| ApiError::BadType("stock".into()))?;
        if v != stock {
            return Err(ApiError::UrlMismatch);
        }
    }

    let account = obj
        .get("account")
        .ok_or_else(|| ApiError::MissingField("account".into()))?
        .as_str()
        .ok_or_else(|| ApiError::BadType("account".into()))?
        .to_string();

    let qty = obj
        .get("qty")
        .ok_or_else(|| ApiError::MissingField("qty".into()))?
        .as_u64()
        .ok_or_else(|| ApiError::BadType("qty".into()))?;

    let direction = obj
        .get("direction")
        .ok_or_else(|| ApiError::MissingField("direction".into()))?
        .as_str()
        .ok_or_else(|| ApiError::BadType("direction".into()))?;
    let side = match direction {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        _ => return Err(ApiError::BadValue("direction".into())),
    };

    let order_type_str = obj
        .get("orderType")
        .or_else(|| obj.get("type"))
        .ok_or_else(|| ApiError::MissingField("orderType".into()))?
        .as_str()
        .ok_or_else(|| ApiError::BadType("orderType".into()))?;
    let order_type = OrderType::from_wire(order_type_str).ok_or_else(|| ApiError::BadValue("orderType".into()))?;

    let price = match obj.get("price") {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.as_u64().ok_or_else(|| ApiError::BadType("price".into()))?),
    };
    if order_type == OrderType::Market {
        if let Some(p) = price {
            if p != 0 {
                return Err(ApiError::BadValue("price".into()));
            }
        }
    }

    Ok(ParsedAdmission {
        account,
        side,
        order_type,
        qty,
        price,
    })
}

pub async fn admit_order(
    State(state): State<ExchangeState>,
    Path((venue, stock)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let parsed = parse_admission(&body, &venue, &stock)?;

    state
        .auth
        .check(&parsed.account, api_key(&headers))
        .map_err(ApiError::from)?;

    let book = state.registry.ensure(&venue, &stock).await?;
    let mut book = book.write().await;
    let result = book.admit(AdmissionRequest {
        account: parsed.account,
        side: parsed.side,
        order_type: parsed.order_type,
        qty: parsed.qty,
        price: parsed.price,
    });

    match result {
        Ok(status) => {
            state.metrics.record_admission(started.elapsed());
            for _ in &status.fills {
                state.metrics.record_trade();
            }
            Ok(ok(serde_json::to_value(status).map_err(|e| ApiError::Internal(e.to_string()))?))
        }
        Err(err) => {
            state.metrics.record_rejection();
            Err(ApiError::from(err))
        }
    }
}

async fn authorize_order_read(
    state: &ExchangeState,
    venue: &str,
    stock: &str,
    order_id: u64,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let book = state
        .registry
        .get(venue, stock)
        .await
        .ok_or(ApiError::NoSuchVenue)?;
    let account = book
        .read()
        .await
        .account_from_order_id(order_id)
        .map(str::to_string)
        .ok_or(ApiError::NoSuchOrder)?;
    state.auth.check(&account, api_key(headers)).map_err(ApiError::from)
}

pub async fn order_status(
    State(state): State<ExchangeState>,
    Path((venue, stock, order_id)): Path<(String, String, u64)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize_order_read(&state, &venue, &stock, order_id, &headers).await?;
    let book = state.registry.get(&venue, &stock).await.ok_or(ApiError::NoSuchVenue)?;
    let status = book.read().await.get_status(order_id)?;
    Ok(ok(serde_json::to_value(status).map_err(|e| ApiError::Internal(e.to_string()))?))
}

pub async fn cancel_order(
    State(state): State<ExchangeState>,
    Path((venue, stock, order_id)): Path<(String, String, u64)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize_order_read(&state, &venue, &stock, order_id, &headers).await?;
    let book = state.registry.get(&venue, &stock).await.ok_or(ApiError::NoSuchVenue)?;
    let status = book.write().await.cancel(order_id)?;
    state.metrics.record_cancellation();
    Ok(ok(serde_json::to_value(status).map_err(|e| ApiError::Internal(e.to_string()))?))
}

pub async fn all_orders(
    State(state): State<ExchangeState>,
    Path((venue, account)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if !state.excess {
        return Err(ApiError::EndpointDisabled);
    }
    state.auth.check(&account, api_key(&headers)).map_err(ApiError::from)?;
    if !state.registry.has_venue(&venue).await {
        return Err(ApiError::NoSuchVenue);
    }

    let mut orders = Vec::new();
    for stock in state.registry.stocks(&venue).await {
        if let Some(book) = state.registry.get(&venue, &stock).await {
            orders.extend(book.read().await.get_all_orders(&account));
        }
    }
    Ok(ok(json!({
        "venue": venue,
        "orders": serde_json::to_value(orders).map_err(|e| ApiError::Internal(e.to_string()))?,
    })))
}

pub async fn all_orders_for_stock(
    State(state): State<ExchangeState>,
    Path((venue, account, stock)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if !state.excess {
        return Err(ApiError::EndpointDisabled);
    }
    state.auth.check(&account, api_key(&headers)).map_err(ApiError::from)?;
    let book = state.registry.get(&venue, &stock).await.ok_or(ApiError::NoSuchVenue)?;
    let orders = book.read().await.get_all_orders(&account);
    Ok(ok(json!({
        "venue": venue,
        "orders": serde_json::to_value(orders).map_err(|e| ApiError::Internal(e.to_string()))?,
    })))
}

/// Supplemented per SPEC_FULL.md §13: leaks cash/shares when auth is
/// disabled, reports `"[hidden]"` per-account figures when enabled.
pub async fn scoreboard(
    State(state): State<ExchangeState>,
    Path((venue, stock)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.registry.get(&venue, &stock).await.ok_or(ApiError::NoSuchVenue)?;
    let book = book.read().await;
    let quote = book.get_quote();
    let last_price = quote.last.unwrap_or(0);

    let mut scores = serde_json::Map::new();
    for account in book.accounts() {
        let position = book.position(account);
        let entry = if state.auth.is_open() {
            json!({
                "cash": position.cash,
                "shares": position.shares,
                "nav": position.nav(last_price),
            })
        } else {
            json!({"cash": "[hidden]", "shares": "[hidden]", "nav": "[hidden]"})
        };
        scores.insert(account.clone(), entry);
    }

    Ok(ok(json!({"venue": venue, "stock": stock, "scores": Value::Object(scores)})))
}
