//! Order book (C5) — the matching engine, the hard part of this
//! repository (spec.md §1–§2).

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use crate::clock::{self, IdAllocator};
use crate::error::{EngineError, EngineResult};
use crate::event::EventBus;
use crate::level::PriceLevel;
use crate::order::{Order, OrderStatus, OrderType, Side};
use crate::position::Ledger;
use crate::quote::QuoteSnapshot;

/// One executed trade, appended to the book's trade tape.
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub buyer: String,
    pub seller: String,
    pub price: u64,
    pub qty: u64,
    pub timestamp: String,
    pub aggressor_side: Side,
}

/// A validated, strongly-typed admission request — the façade's job is
/// to produce one of these from a loosely-typed JSON body (spec.md §9).
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub account: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: u64,
    /// Required for limit/ioc/fok; ignored for market (§4.4.1).
    pub price: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthRow {
    pub price: u64,
    pub qty: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookDepth {
    pub venue: String,
    pub stock: String,
    pub bids: Vec<DepthRow>,
    pub asks: Vec<DepthRow>,
}

/// The per-(venue,stock) matching engine instance and its state (C5).
///
/// Concurrency model: a `Book` has no internal locking of its own —
/// callers (the [`crate::registry::Registry`]) wrap each one in a
/// `tokio::sync::RwLock` so that every method here runs inside that
/// lock's critical section, per spec.md §5.
pub struct Book {
    venue: String,
    stock: String,
    orders: HashMap<u64, Order>,
    // Ascending by price: lowest ask first, matching spec.md §3's
    // "ask ladder traversed lowest-price-first".
    asks: BTreeMap<u64, PriceLevel>,
    // `Reverse` flips ordering so the lowest `Reverse(price)` key is the
    // highest real price — "bid ladder traversed highest-price-first".
    bids: BTreeMap<Reverse<u64>, PriceLevel>,
    ids: IdAllocator,
    ledger: Ledger,
    account_index: HashMap<String, Vec<u64>>,
    trade_tape: Vec<Trade>,
    bid_depth_total: u64,
    ask_depth_total: u64,
    quote: QuoteSnapshot,
    events: Arc<EventBus>,
}

impl Book {
    pub fn new(venue: impl Into<String>, stock: impl Into<String>, events: Arc<EventBus>) -> Self {
        let venue = venue.into();
        let stock = stock.into();
        let quote = QuoteSnapshot::empty(venue.clone(), stock.clone());
        Self {
            venue,
            stock,
            orders: HashMap::new(),
            asks: BTreeMap::new(),
            bids: BTreeMap::new(),
            ids: IdAllocator::new(),
            ledger: Ledger::new(),
            account_index: HashMap::new(),
            trade_tape: Vec::new(),
            bid_depth_total: 0,
            ask_depth_total: 0,
            quote,
            events,
        }
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn stock(&self) -> &str {
        &self.stock
    }

    // ---- 4.4.1 Admission contract -----------------------------------

    pub fn admit(&mut self, req: AdmissionRequest) -> EngineResult<OrderStatus> {
        if req.qty == 0 {
            return Err(EngineError::BadValue("qty"));
        }
        let limit_price = match req.order_type {
            OrderType::Market => None,
            _ => match req.price {
                Some(p) if p >= 1 => Some(p),
                Some(_) => return Err(EngineError::BadValue("price")),
                None => return Err(EngineError::MissingField("price")),
            },
        };

        let id = self.ids.allocate();
        let order = Order::new(
            id,
            self.venue.clone(),
            self.stock.clone(),
            req.account.clone(),
            req.side,
            req.order_type,
            req.qty,
            limit_price,
        );
        self.orders.insert(id, order);
        self.account_index.entry(req.account).or_default().push(id);

        if req.order_type == OrderType::FillOrKill {
            let achievable = self.achievable_fill(req.side, limit_price);
            if achievable < req.qty {
                // Pre-check failed: close with zero fills, touch nothing
                // else. Book, positions, and trade tape stay byte-identical
                // to their pre-admission state (§4.4.2, §8 FOK atomicity).
                self.orders.get_mut(&id).unwrap().close();
                return Ok(self.orders[&id].status());
            }
        }

        self.run_match(id);
        self.dispose(id, req.order_type, req.side, limit_price);
        self.refresh_quote();

        Ok(self.orders[&id].status())
    }

    /// Read-only scan of the opposite ladder under the admissibility
    /// predicate, used only by the fill-or-kill pre-check. Never
    /// mutates anything.
    fn achievable_fill(&self, side: Side, limit_price: Option<u64>) -> u64 {
        let admissible = |price: u64| match limit_price {
            None => true,
            Some(l) => match side {
                Side::Buy => price <= l,
                Side::Sell => price >= l,
            },
        };
        match side {
            Side::Buy => self
                .asks
                .iter()
                .take_while(|(price, _)| admissible(**price))
                .map(|(_, level)| level.sum_of_remaining_quantities(&self.orders))
                .sum(),
            Side::Sell => self
                .bids
                .iter()
                .take_while(|(Reverse(price), _)| admissible(*price))
                .map(|(_, level)| level.sum_of_remaining_quantities(&self.orders))
                .sum(),
        }
    }

    // ---- 4.4.2 Matching algorithm ------------------------------------

    fn run_match(&mut self, incoming_id: u64) {
        loop {
            let side = self.orders[&incoming_id].side;
            let order_type = self.orders[&incoming_id].order_type;
            let limit_price = self.orders[&incoming_id].price;

            let best_price = match side {
                Side::Buy => self.asks.keys().next().copied(),
                Side::Sell => self.bids.keys().next().map(|Reverse(p)| *p),
            };
            let Some(best_price) = best_price else {
                break;
            };

            let admissible = match order_type {
                OrderType::Market => true,
                _ => {
                    let l = limit_price.expect("non-market orders always carry a price");
                    match side {
                        Side::Buy => best_price <= l,
                        Side::Sell => best_price >= l,
                    }
                }
            };
            if !admissible {
                break;
            }

            let resting_id = match side {
                Side::Buy => self.asks.get_mut(&best_price).unwrap().remove_first(),
                Side::Sell => self.bids.get_mut(&Reverse(best_price)).unwrap().remove_first(),
            }
            .expect("non-empty level must yield an order id");

            let trade_qty = {
                let incoming_remaining = self.orders[&incoming_id].remaining;
                let resting_remaining = self.orders[&resting_id].remaining;
                incoming_remaining.min(resting_remaining)
            };
            let timestamp = clock::now();

            self.orders
                .get_mut(&incoming_id)
                .unwrap()
                .append_fill(best_price, trade_qty, timestamp.clone());
            self.orders
                .get_mut(&resting_id)
                .unwrap()
                .append_fill(best_price, trade_qty, timestamp.clone());

            let (buyer, seller) = match side {
                Side::Buy => (
                    self.orders[&incoming_id].account.clone(),
                    self.orders[&resting_id].account.clone(),
                ),
                Side::Sell => (
                    self.orders[&resting_id].account.clone(),
                    self.orders[&incoming_id].account.clone(),
                ),
            };
            self.ledger.apply_trade(&buyer, &seller, best_price, trade_qty);

            let trade = Trade {
                buyer,
                seller,
                price: best_price,
                qty: trade_qty,
                timestamp: timestamp.clone(),
                aggressor_side: side,
            };
            self.trade_tape.push(trade);

            match side {
                Side::Buy => self.ask_depth_total -= trade_qty,
                Side::Sell => self.bid_depth_total -= trade_qty,
            }

            self.quote.last = Some(best_price);
            self.quote.last_size = Some(trade_qty);
            self.quote.last_trade = Some(timestamp.clone());

            self.emit_execution(incoming_id, best_price, trade_qty, timestamp.clone());
            self.emit_execution(resting_id, best_price, trade_qty, timestamp);

            let resting_remaining = self.orders[&resting_id].remaining;
            if resting_remaining == 0 {
                self.orders.get_mut(&resting_id).unwrap().close();
                let level_empty = match side {
                    Side::Buy => self.asks.get(&best_price).map_or(true, |l| l.is_empty()),
                    Side::Sell => self
                        .bids
                        .get(&Reverse(best_price))
                        .map_or(true, |l| l.is_empty()),
                };
                if level_empty {
                    match side {
                        Side::Buy => {
                            self.asks.remove(&best_price);
                        }
                        Side::Sell => {
                            self.bids.remove(&Reverse(best_price));
                        }
                    }
                }
            } else {
                match side {
                    Side::Buy => self.asks.get_mut(&best_price).unwrap().push_front(resting_id),
                    Side::Sell => self
                        .bids
                        .get_mut(&Reverse(best_price))
                        .unwrap()
                        .push_front(resting_id),
                }
            }

            if self.orders[&incoming_id].remaining == 0 {
                break;
            }
        }
    }

    fn emit_execution(&self, order_id: u64, price: u64, qty: u64, timestamp: String) {
        let order = &self.orders[&order_id];
        self.events.publish_execution(
            &self.venue,
            &self.stock,
            &order.account,
            order.status(),
            crate::order::Fill { price, qty, timestamp },
            order.remaining,
        );
    }

    // ---- Post-matching disposal (§4.4.2 step 5) ----------------------

    fn dispose(&mut self, incoming_id: u64, order_type: OrderType, side: Side, limit_price: Option<u64>) {
        let remaining = self.orders[&incoming_id].remaining;

        match order_type {
            OrderType::Limit if remaining > 0 => {
                let price = limit_price.expect("limit orders always carry a price");
                match side {
                    Side::Buy => self.bids.entry(Reverse(price)).or_default().append_order(incoming_id),
                    Side::Sell => self.asks.entry(price).or_default().append_order(incoming_id),
                }
                match side {
                    Side::Buy => self.bid_depth_total += remaining,
                    Side::Sell => self.ask_depth_total += remaining,
                }
            }
            _ => {
                // Fully-filled limit, market (discard remainder), ioc
                // (discard remainder), or fok (fully filled by
                // construction) all close with no resting contribution.
                self.orders.get_mut(&incoming_id).unwrap().close();
            }
        }
    }

    // ---- 4.4.3 Quote refresh ------------------------------------------

    fn refresh_quote(&mut self) {
        let (bid, bid_size) = match self.bids.iter().next() {
            Some((Reverse(price), level)) => (Some(*price), Some(level.sum_of_remaining_quantities(&self.orders))),
            None => (None, None),
        };
        let (ask, ask_size) = match self.asks.iter().next() {
            Some((price, level)) => (Some(*price), Some(level.sum_of_remaining_quantities(&self.orders))),
            None => (None, None),
        };

        self.quote.bid = bid;
        self.quote.bid_size = bid_size;
        self.quote.bid_depth = if self.bids.is_empty() { None } else { Some(self.bid_depth_total) };
        self.quote.ask = ask;
        self.quote.ask_size = ask_size;
        self.quote.ask_depth = if self.asks.is_empty() { None } else { Some(self.ask_depth_total) };
        self.quote.timestamp = clock::now();

        self.events.publish_quote(&self.venue, &self.stock, self.quote.clone());
    }

    // ---- 4.4.4 Cancellation contract -----------------------------------

    pub fn cancel(&mut self, order_id: u64) -> EngineResult<OrderStatus> {
        let order = self.orders.get(&order_id).ok_or(EngineError::NoSuchOrder)?;
        if !order.open {
            // Idempotent: unchanged status, no trades, no quote change.
            return Ok(order.status());
        }

        let side = order.side;
        let price = order.price.expect("open orders are always limit orders with a price");
        let remaining = order.remaining;

        let level_empty = match side {
            Side::Buy => {
                let level = self.bids.get_mut(&Reverse(price)).expect("resting order must have a level");
                level.remove_by_identity(order_id);
                level.is_empty()
            }
            Side::Sell => {
                let level = self.asks.get_mut(&price).expect("resting order must have a level");
                level.remove_by_identity(order_id);
                level.is_empty()
            }
        };
        if level_empty {
            match side {
                Side::Buy => {
                    self.bids.remove(&Reverse(price));
                }
                Side::Sell => {
                    self.asks.remove(&price);
                }
            }
        }
        match side {
            Side::Buy => self.bid_depth_total -= remaining,
            Side::Sell => self.ask_depth_total -= remaining,
        }

        self.orders.get_mut(&order_id).unwrap().close();
        self.refresh_quote();

        Ok(self.orders[&order_id].status())
    }

    // ---- 4.4.5 Ancillary reads ------------------------------------------

    pub fn get_book(&self) -> BookDepth {
        BookDepth {
            venue: self.venue.clone(),
            stock: self.stock.clone(),
            bids: self
                .bids
                .iter()
                .map(|(Reverse(price), level)| DepthRow {
                    price: *price,
                    qty: level.sum_of_remaining_quantities(&self.orders),
                })
                .collect(),
            asks: self
                .asks
                .iter()
                .map(|(price, level)| DepthRow {
                    price: *price,
                    qty: level.sum_of_remaining_quantities(&self.orders),
                })
                .collect(),
        }
    }

    pub fn get_quote(&self) -> QuoteSnapshot {
        self.quote.clone()
    }

    pub fn get_status(&self, order_id: u64) -> EngineResult<OrderStatus> {
        self.orders.get(&order_id).map(Order::status).ok_or(EngineError::NoSuchOrder)
    }

    pub fn account_from_order_id(&self, order_id: u64) -> Option<&str> {
        self.orders.get(&order_id).map(|o| o.account.as_str())
    }

    /// Every order ever submitted by `account` on this book, in
    /// admission order. Expensive — gated by a façade-level config flag.
    pub fn get_all_orders(&self, account: &str) -> Vec<OrderStatus> {
        self.account_index
            .get(account)
            .map(|ids| ids.iter().filter_map(|id| self.orders.get(id)).map(Order::status).collect())
            .unwrap_or_default()
    }

    pub fn trade_tape(&self) -> &[Trade] {
        &self.trade_tape
    }

    /// Every account that has ever traded on this book (scoreboard, §13).
    pub fn accounts(&self) -> Vec<&String> {
        self.ledger.accounts().collect()
    }

    pub fn position(&self, account: &str) -> crate::position::Position {
        self.ledger.position(account)
    }

    #[cfg(debug_assertions)]
    pub fn assert_invariants(&self) {
        debug_assert_eq!(self.ledger.total_shares(), 0, "share conservation violated");
        debug_assert_eq!(self.ledger.total_cash(), 0, "cash conservation violated");
        for order in self.orders.values() {
            debug_assert_eq!(
                order.original_qty,
                order.remaining + order.fills.iter().map(|f| f.qty).sum::<u64>(),
                "remaining identity violated for order {}",
                order.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        Book::new("TESTEX", "FOOBAR", Arc::new(EventBus::new()))
    }

    fn admit(book: &mut Book, account: &str, side: Side, order_type: OrderType, qty: u64, price: Option<u64>) -> OrderStatus {
        book.admit(AdmissionRequest {
            account: account.to_string(),
            side,
            order_type,
            qty,
            price,
        })
        .unwrap()
    }

    // Scenario 1: limit rest
    #[test]
    fn scenario_limit_rest() {
        let mut book = book();
        let status = admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        assert!(status.open);
        assert_eq!(status.qty, 10);
        let quote = book.get_quote();
        assert_eq!(quote.bid, Some(5000));
        assert_eq!(quote.bid_size, Some(10));
        assert_eq!(quote.bid_depth, Some(10));
        assert!(book.trade_tape().is_empty());
    }

    // Scenario 2: cross and price improvement
    #[test]
    fn scenario_cross_and_price_improvement() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        let sell = admit(&mut book, "B", Side::Sell, OrderType::Limit, 4, Some(4900));

        assert_eq!(book.trade_tape().len(), 1);
        let trade = &book.trade_tape()[0];
        assert_eq!(trade.price, 5000);
        assert_eq!(trade.qty, 4);

        assert_eq!(book.ledger.position("A").shares, 4);
        assert_eq!(book.ledger.position("A").cash, -20000);
        assert_eq!(book.ledger.position("B").shares, -4);
        assert_eq!(book.ledger.position("B").cash, 20000);

        assert!(!sell.open);
        let buy_status = book.get_status(0).unwrap();
        assert_eq!(buy_status.qty, 6);

        let quote = book.get_quote();
        assert_eq!(quote.bid_size, Some(6));
        assert_eq!(quote.last, Some(5000));
        assert_eq!(quote.last_size, Some(4));
    }

    // Scenario 3: market sweep
    #[test]
    fn scenario_market_sweep() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        let sell = admit(&mut book, "B", Side::Sell, OrderType::Market, 15, None);

        assert_eq!(book.trade_tape().len(), 1);
        assert_eq!(book.trade_tape()[0].qty, 10);
        assert!(!sell.open);
        assert_eq!(sell.qty, 5);

        let quote = book.get_quote();
        assert_eq!(quote.bid, None);
        assert_eq!(quote.last, Some(5000));
        assert_eq!(quote.last_size, Some(10));
    }

    // Scenario 4: IoC partial (out of market -> zero trades)
    #[test]
    fn scenario_ioc_out_of_market() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        let sell = admit(&mut book, "B", Side::Sell, OrderType::ImmediateOrCancel, 3, Some(5100));

        assert!(book.trade_tape().is_empty());
        assert!(!sell.open);
        assert_eq!(sell.qty, 3);

        let buy_status = book.get_status(0).unwrap();
        assert_eq!(buy_status.qty, 10);
    }

    // Scenario 5: FoK insufficient liquidity
    #[test]
    fn scenario_fok_insufficient() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        let sell = admit(&mut book, "B", Side::Sell, OrderType::FillOrKill, 20, Some(4000));

        assert!(book.trade_tape().is_empty());
        assert!(!sell.open);
        assert_eq!(sell.qty, 20);
        assert!(sell.fills.is_empty());

        let buy_status = book.get_status(0).unwrap();
        assert_eq!(buy_status.qty, 10);
        assert!(buy_status.open);

        let quote = book.get_quote();
        assert_eq!(quote.bid, Some(5000));
        assert_eq!(quote.bid_size, Some(10));
    }

    // Scenario 6: cancel, then cancel again (idempotent)
    #[test]
    fn scenario_cancel_idempotent() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));

        let first = book.cancel(0).unwrap();
        assert!(!first.open);
        let quote = book.get_quote();
        assert_eq!(quote.bid, None);
        assert!(book.trade_tape().is_empty());

        let second = book.cancel(0).unwrap();
        assert_eq!(first.qty, second.qty);
        assert_eq!(first.open, second.open);
        assert!(book.trade_tape().is_empty());
    }

    #[test]
    fn fok_exact_liquidity_fully_fills() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 10, Some(5000));
        let sell = admit(&mut book, "B", Side::Sell, OrderType::FillOrKill, 10, Some(5000));
        assert!(!sell.open);
        assert_eq!(sell.qty, 0);
        assert_eq!(book.trade_tape().len(), 1);
    }

    #[test]
    fn price_time_priority_oldest_order_fills_first() {
        let mut book = book();
        admit(&mut book, "A", Side::Buy, OrderType::Limit, 5, Some(5000));
        admit(&mut book, "B", Side::Buy, OrderType::Limit, 5, Some(5000));
        admit(&mut book, "C", Side::Sell, OrderType::Limit, 5, Some(5000));

        assert_eq!(book.trade_tape().len(), 1);
        assert_eq!(book.trade_tape()[0].buyer, "A");
        let a = book.get_status(0).unwrap();
        let b = book.get_status(1).unwrap();
        assert_eq!(a.qty, 0);
        assert_eq!(b.qty, 5);
    }

    #[test]
    fn cancel_unknown_order_is_no_such_order() {
        let mut book = book();
        assert_eq!(book.cancel(999), Err(EngineError::NoSuchOrder));
    }

    #[test]
    fn admit_rejects_zero_quantity() {
        let mut book = book();
        let result = book.admit(AdmissionRequest {
            account: "A".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty: 0,
            price: Some(100),
        });
        assert_eq!(result, Err(EngineError::BadValue("qty")));
    }

    #[test]
    fn admit_rejects_missing_price_for_limit() {
        let mut book = book();
        let result = book.admit(AdmissionRequest {
            account: "A".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            qty: 1,
            price: None,
        });
        assert_eq!(result, Err(EngineError::MissingField("price")));
    }
}
