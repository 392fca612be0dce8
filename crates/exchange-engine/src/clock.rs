//! Clock & ID allocator (C1).
//!
//! Timestamps are ISO-8601 UTC with millisecond precision and a
//! terminal `Z`, matching the wire format Stockfighter clients expect.
//! ID allocation is per-book: each [`crate::book::Book`] owns a private
//! counter starting at 0, incremented atomically with admission (the
//! counter lives behind the same lock that guards the rest of the
//! book's state, so "atomic" here means "serialized by the book's
//! critical section", not a separate atomic primitive).

use chrono::Utc;

/// Current wall-clock time, ISO-8601 UTC with millisecond precision.
pub fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Per-book monotonic id allocator.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocate and return the next id; ids are strictly increasing in
    /// call order.
    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.allocate(), 0);
        assert_eq!(alloc.allocate(), 1);
        assert_eq!(alloc.allocate(), 2);
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = now();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
    }
}
