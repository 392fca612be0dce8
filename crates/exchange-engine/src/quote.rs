//! Quote snapshot: cached top-of-book summary, recomputed after every
//! book mutation (§4.4.3). Absence of a side is represented by `None`
//! on that side's fields, not by a sentinel price.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    pub venue: String,
    pub stock: String,
    pub bid: Option<u64>,
    pub bid_size: Option<u64>,
    pub bid_depth: Option<u64>,
    pub ask: Option<u64>,
    pub ask_size: Option<u64>,
    pub ask_depth: Option<u64>,
    pub last: Option<u64>,
    pub last_size: Option<u64>,
    pub last_trade: Option<String>,
    pub timestamp: String,
}

impl QuoteSnapshot {
    pub fn empty(venue: impl Into<String>, stock: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            stock: stock.into(),
            bid: None,
            bid_size: None,
            bid_depth: None,
            ask: None,
            ask_size: None,
            ask_depth: None,
            last: None,
            last_size: None,
            last_trade: None,
            timestamp: crate::clock::now(),
        }
    }
}
