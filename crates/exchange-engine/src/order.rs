//! Order record (C3).
//!
//! Identity is immutable once assigned; fills/remaining/open-flag are
//! the only mutable state, and are only ever touched by the owning
//! book's matching and cancellation paths (§3, §4.3).

use serde::Serialize;

use crate::clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    Limit,
    Market,
    ImmediateOrCancel,
    FillOrKill,
}

impl OrderType {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "limit" => Some(Self::Limit),
            "market" => Some(Self::Market),
            "immediate-or-cancel" => Some(Self::ImmediateOrCancel),
            "fill-or-kill" => Some(Self::FillOrKill),
            _ => None,
        }
    }
}

/// One fill against an order: price, quantity, and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub price: u64,
    pub qty: u64,
    pub timestamp: String,
}

/// A resting or closed order. Owned by a [`crate::book::Book`] in an
/// id-keyed map; price levels hold only the id (see spec.md §9's
/// design note on avoiding reference cycles).
#[derive(Debug, Clone)]
pub struct Order {
    pub id: u64,
    pub venue: String,
    pub stock: String,
    pub account: String,
    pub side: Side,
    pub order_type: OrderType,
    pub original_qty: u64,
    /// Limit price in cents. Meaningful for limit/ioc/fok; ignored
    /// semantically for market orders (§4.4.1).
    pub price: Option<u64>,
    pub timestamp: String,
    pub remaining: u64,
    pub fills: Vec<Fill>,
    pub open: bool,
}

impl Order {
    pub fn new(
        id: u64,
        venue: impl Into<String>,
        stock: impl Into<String>,
        account: impl Into<String>,
        side: Side,
        order_type: OrderType,
        qty: u64,
        price: Option<u64>,
    ) -> Self {
        Self {
            id,
            venue: venue.into(),
            stock: stock.into(),
            account: account.into(),
            side,
            order_type,
            original_qty: qty,
            price,
            timestamp: clock::now(),
            remaining: qty,
            fills: Vec::new(),
            open: order_type == OrderType::Limit,
        }
    }

    /// Record a fill: decrements remaining and appends to the fill list.
    /// Does not touch `open` — callers decide disposal per §4.4.2.
    pub fn append_fill(&mut self, price: u64, qty: u64, timestamp: String) {
        debug_assert!(qty <= self.remaining, "fill exceeds remaining quantity");
        self.remaining -= qty;
        self.fills.push(Fill {
            price,
            qty,
            timestamp,
        });
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn total_filled(&self) -> u64 {
        self.original_qty - self.remaining
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus {
            id: self.id,
            venue: self.venue.clone(),
            stock: self.stock.clone(),
            account: self.account.clone(),
            side: self.side,
            order_type: self.order_type,
            original_qty: self.original_qty,
            qty: self.remaining,
            price: self.price,
            timestamp: self.timestamp.clone(),
            fills: self.fills.clone(),
            total_filled: self.total_filled(),
            open: self.open,
        }
    }
}

/// Outward-facing snapshot of an order, independent of the internal
/// mutable record (§4.3 "status snapshot").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStatus {
    pub id: u64,
    pub venue: String,
    pub stock: String,
    pub account: String,
    pub side: Side,
    pub order_type: OrderType,
    pub original_qty: u64,
    pub qty: u64,
    pub price: Option<u64>,
    pub timestamp: String,
    pub fills: Vec<Fill>,
    pub total_filled: u64,
    pub open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_fill_decrements_remaining_and_records_fill() {
        let mut order = Order::new(0, "V", "S", "A", Side::Buy, OrderType::Limit, 10, Some(100));
        order.append_fill(100, 4, clock::now());
        assert_eq!(order.remaining, 6);
        assert_eq!(order.fills.len(), 1);
        assert_eq!(order.total_filled(), 4);
    }

    #[test]
    fn remaining_identity_holds() {
        let mut order = Order::new(0, "V", "S", "A", Side::Buy, OrderType::Limit, 10, Some(100));
        order.append_fill(100, 3, clock::now());
        order.append_fill(100, 2, clock::now());
        let filled: u64 = order.fills.iter().map(|f| f.qty).sum();
        assert_eq!(order.original_qty, order.remaining + filled);
    }
}
