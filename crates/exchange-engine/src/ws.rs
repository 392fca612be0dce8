//! Market-data fan-out over WebSocket (§12).
//!
//! An external collaborator per spec.md §1/§6: the engine only
//! guarantees the pub/sub contract of [`crate::event`]; this module is
//! the transport that rides on top of it, grounded on `server`'s
//! [`MessageHandler`] trait.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::json;
use server::{ConnectionId, FeedSender, MessageHandler};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::event::{EventBus, Topic};

/// A client's request to start receiving one of C6's four topic
/// shapes. `stock`/`account` absent selects the coarser venue-only or
/// venue+stock/venue+account topic.
#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    venue: String,
    #[serde(default)]
    stock: Option<String>,
    #[serde(default)]
    account: Option<String>,
}

fn topic_for(req: &SubscribeRequest) -> Topic {
    match (&req.stock, &req.account) {
        (Some(stock), Some(account)) => {
            Topic::VenueStockAccount(req.venue.clone(), stock.clone(), account.clone())
        }
        (Some(stock), None) => Topic::VenueStock(req.venue.clone(), stock.clone()),
        (None, Some(account)) => Topic::VenueAccount(req.venue.clone(), account.clone()),
        (None, None) => Topic::Venue(req.venue.clone()),
    }
}

/// Dispatches each connection's subscribe message to the matching
/// broadcast topic and forwards events until disconnect.
pub struct SubscriptionHandler {
    events: Arc<EventBus>,
    feeds: Mutex<HashMap<ConnectionId, FeedSender>>,
    /// Forwarding tasks per connection, so `on_disconnect` can abort any
    /// still blocked on a quiet topic's `rx.recv()` instead of leaking
    /// them until the topic next publishes.
    tasks: Mutex<HashMap<ConnectionId, Vec<tokio::task::AbortHandle>>>,
}

impl SubscriptionHandler {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            events,
            feeds: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn reply(ok: bool, body: impl Into<String>) -> Message {
        Message::Text(json!({ "ok": ok, "message": body.into() }).to_string())
    }
}

impl MessageHandler for SubscriptionHandler {
    fn handle(&self, conn_id: ConnectionId, message: Message) -> Option<Message> {
        let Message::Text(text) = &message else {
            return None;
        };

        let req: SubscribeRequest = match serde_json::from_str(text) {
            Ok(req) => req,
            Err(e) => return Some(Self::reply(false, format!("bad subscribe request: {e}"))),
        };

        let feed = self.feeds.lock().unwrap().get(&conn_id).cloned();
        let Some(feed) = feed else {
            return Some(Self::reply(false, "connection not registered"));
        };

        let topic = topic_for(&req);
        let mut rx = self.events.subscribe(topic.clone());

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let text = match serde_json::to_string(&event) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(%e, "failed to encode market-data event");
                                continue;
                            }
                        };
                        if feed.send(Message::Text(text)).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(conn_id, skipped, "subscriber lagged, dropping oldest events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        self.tasks
            .lock()
            .unwrap()
            .entry(conn_id)
            .or_default()
            .push(handle.abort_handle());

        Some(Self::reply(true, "subscribed"))
    }

    fn on_connect(&self, conn_id: ConnectionId, _peer_addr: SocketAddr, feed: FeedSender) {
        self.feeds.lock().unwrap().insert(conn_id, feed);
    }

    fn on_disconnect(&self, conn_id: ConnectionId) {
        self.feeds.lock().unwrap().remove(&conn_id);
        if let Some(handles) = self.tasks.lock().unwrap().remove(&conn_id) {
            for handle in handles {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_selection_picks_most_specific_shape() {
        let both = SubscribeRequest {
            venue: "TESTEX".into(),
            stock: Some("FOOBAR".into()),
            account: Some("ACC1".into()),
        };
        assert_eq!(
            topic_for(&both),
            Topic::VenueStockAccount("TESTEX".into(), "FOOBAR".into(), "ACC1".into())
        );

        let venue_only = SubscribeRequest {
            venue: "TESTEX".into(),
            stock: None,
            account: None,
        };
        assert_eq!(topic_for(&venue_only), Topic::Venue("TESTEX".into()));
    }

    #[test]
    fn handle_rejects_unregistered_connection() {
        let handler = SubscriptionHandler::new(Arc::new(EventBus::new()));
        let msg = Message::Text(r#"{"venue":"TESTEX"}"#.to_string());
        let reply = handler.handle(1, msg).expect("handler replies");
        let Message::Text(text) = reply else {
            panic!("expected text reply");
        };
        assert!(text.contains("\"ok\":false"));
    }

    #[test]
    fn handle_rejects_malformed_json() {
        let handler = SubscriptionHandler::new(Arc::new(EventBus::new()));
        let msg = Message::Text("not json".to_string());
        let reply = handler.handle(1, msg).expect("handler replies");
        let Message::Text(text) = reply else {
            panic!("expected text reply");
        };
        assert!(text.contains("\"ok\":false"));
    }
}
