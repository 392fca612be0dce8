//! Event bus (C6): topic-addressed pub/sub for market-data fan-out.
//!
//! Each topic gets its own [`tokio::sync::broadcast`] channel. Broadcast
//! channels are exactly the "bounded-buffer-with-drop-oldest" discipline
//! spec.md §4.5/§5 calls for: `send` never blocks the matching critical
//! section, and a subscriber that falls behind a full buffer's worth of
//! messages gets `Lagged(n)` on its next `recv` rather than stalling the
//! publisher.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::order::{Fill, OrderStatus};
use crate::quote::QuoteSnapshot;

/// Per-subscriber channel capacity. Chosen generously since the cost of
/// lagging is a few dropped market-data messages, never a stall.
const TOPIC_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Venue(String),
    VenueStock(String, String),
    VenueAccount(String, String),
    VenueStockAccount(String, String, String),
}

/// An event published through the bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Execution {
        venue: String,
        stock: String,
        account: String,
        order: OrderStatus,
        fill: Fill,
        standing_qty: u64,
    },
    Quote {
        venue: String,
        stock: String,
        quote: QuoteSnapshot,
    },
}

#[derive(Default)]
pub struct EventBus {
    channels: Mutex<HashMap<Topic, broadcast::Sender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one topic. Creates the underlying channel lazily —
    /// a topic nobody has subscribed to yet costs nothing to publish to.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<EngineEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    fn publish_to(&self, topic: Topic, event: &EngineEvent) {
        let channels = self.channels.lock().unwrap();
        if let Some(sender) = channels.get(&topic) {
            // Err here only means "no receivers right now" — not an error
            // the publisher (the matching critical section) cares about.
            let _ = sender.send(event.clone());
        }
    }

    /// Fan out one execution event to all four matching topics
    /// (venue; venue+stock; venue+account; venue+stock+account), per
    /// spec.md §4.5.
    pub fn publish_execution(
        &self,
        venue: &str,
        stock: &str,
        account: &str,
        order: OrderStatus,
        fill: Fill,
        standing_qty: u64,
    ) {
        let event = EngineEvent::Execution {
            venue: venue.to_string(),
            stock: stock.to_string(),
            account: account.to_string(),
            order,
            fill,
            standing_qty,
        };
        self.publish_to(Topic::Venue(venue.to_string()), &event);
        self.publish_to(Topic::VenueStock(venue.to_string(), stock.to_string()), &event);
        self.publish_to(Topic::VenueAccount(venue.to_string(), account.to_string()), &event);
        self.publish_to(
            Topic::VenueStockAccount(venue.to_string(), stock.to_string(), account.to_string()),
            &event,
        );
    }

    /// Fan out a quote event to the venue and venue+stock topics — a
    /// quote has no single owning account, so it never reaches the two
    /// account-scoped topics.
    pub fn publish_quote(&self, venue: &str, stock: &str, quote: QuoteSnapshot) {
        let event = EngineEvent::Quote {
            venue: venue.to_string(),
            stock: stock.to_string(),
            quote,
        };
        self.publish_to(Topic::Venue(venue.to_string()), &event);
        self.publish_to(Topic::VenueStock(venue.to_string(), stock.to_string()), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, Side};

    fn sample_order() -> OrderStatus {
        crate::order::Order::new(0, "V", "S", "A", Side::Buy, OrderType::Limit, 10, Some(100)).status()
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Topic::VenueStock("V".into(), "S".into()));

        bus.publish_execution(
            "V",
            "S",
            "A",
            sample_order(),
            Fill {
                price: 100,
                qty: 1,
                timestamp: crate::clock::now(),
            },
            9,
        );

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::Execution { .. }));
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish_quote(
            "V",
            "S",
            QuoteSnapshot {
                venue: "V".into(),
                stock: "S".into(),
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
            },
        );
    }
}
