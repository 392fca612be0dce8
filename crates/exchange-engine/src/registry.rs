//! Registry (C7): books keyed by (venue, stock), with a creation cap.
//!
//! Creation is serialized behind a single `tokio::sync::Mutex` guarding
//! the cap check and the insert as one atomic step (spec.md §5 "the
//! registry's creation path is serialized globally to enforce the cap
//! atomically"). Once created, a book's own `RwLock` is what serializes
//! its mutating operations — different books proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::book::Book;
use crate::error::{EngineError, EngineResult};
use crate::event::EventBus;

pub struct Registry {
    books: Mutex<HashMap<(String, String), Arc<RwLock<Book>>>>,
    max_books: u32,
    events: Arc<EventBus>,
}

impl Registry {
    pub fn new(max_books: u32) -> Self {
        Self {
            books: Mutex::new(HashMap::new()),
            max_books,
            events: Arc::new(EventBus::new()),
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Returns the existing book for (venue, stock), or creates one.
    /// The cap value 0 disables the check.
    pub async fn ensure(&self, venue: &str, stock: &str) -> EngineResult<Arc<RwLock<Book>>> {
        let mut books = self.books.lock().await;
        let key = (venue.to_string(), stock.to_string());
        if let Some(book) = books.get(&key) {
            return Ok(book.clone());
        }
        if self.max_books != 0 && books.len() as u32 >= self.max_books {
            return Err(EngineError::TooManyBooks);
        }
        let book = Arc::new(RwLock::new(Book::new(venue, stock, self.events.clone())));
        books.insert(key, book.clone());
        Ok(book)
    }

    /// Looks up a book without creating one.
    pub async fn get(&self, venue: &str, stock: &str) -> Option<Arc<RwLock<Book>>> {
        let books = self.books.lock().await;
        books.get(&(venue.to_string(), stock.to_string())).cloned()
    }

    /// Distinct venues referenced so far.
    pub async fn venues(&self) -> Vec<String> {
        let books = self.books.lock().await;
        let mut venues: Vec<String> = books.keys().map(|(v, _)| v.clone()).collect();
        venues.sort();
        venues.dedup();
        venues
    }

    pub async fn has_venue(&self, venue: &str) -> bool {
        let books = self.books.lock().await;
        books.keys().any(|(v, _)| v == venue)
    }

    /// Stocks referenced on one venue.
    pub async fn stocks(&self, venue: &str) -> Vec<String> {
        let books = self.books.lock().await;
        let mut stocks: Vec<String> = books
            .keys()
            .filter(|(v, _)| v == venue)
            .map(|(_, s)| s.clone())
            .collect();
        stocks.sort();
        stocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_creates_and_then_reuses_the_same_book() {
        let registry = Registry::new(0);
        let a = registry.ensure("TESTEX", "FOOBAR").await.unwrap();
        let b = registry.ensure("TESTEX", "FOOBAR").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn cap_of_zero_is_unlimited() {
        let registry = Registry::new(0);
        for i in 0..10 {
            registry.ensure("TESTEX", &format!("S{i}")).await.unwrap();
        }
        assert_eq!(registry.stocks("TESTEX").await.len(), 10);
    }

    #[tokio::test]
    async fn cap_rejects_creation_past_the_limit() {
        let registry = Registry::new(1);
        registry.ensure("TESTEX", "A").await.unwrap();
        let result = registry.ensure("TESTEX", "B").await;
        assert_eq!(result.err(), Some(EngineError::TooManyBooks));
    }

    #[tokio::test]
    async fn cap_does_not_block_re_fetching_an_existing_book() {
        let registry = Registry::new(1);
        registry.ensure("TESTEX", "A").await.unwrap();
        assert!(registry.ensure("TESTEX", "A").await.is_ok());
    }

    #[tokio::test]
    async fn venues_lists_distinct_venues() {
        let registry = Registry::new(0);
        registry.ensure("V1", "A").await.unwrap();
        registry.ensure("V1", "B").await.unwrap();
        registry.ensure("V2", "A").await.unwrap();
        assert_eq!(registry.venues().await, vec!["V1".to_string(), "V2".to_string()]);
    }
}
