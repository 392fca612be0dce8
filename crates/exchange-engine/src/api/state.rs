//! Shared state threaded into every handler.
//!
//! Mirrors the teacher's `Arc`-wrapped `MatchingApiState<S>` pattern: one
//! cheaply-`Clone`-able handle, cloned once per request by axum's
//! `State` extractor.

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::metrics::ExchangeMetrics;
use crate::registry::Registry;

pub struct Inner {
    pub registry: Registry,
    pub auth: AuthGate,
    /// Enables the `/accounts/{a}/orders` and `.../stocks/{s}/orders`
    /// routes (spec.md §6 "gated by excess-responses flag AND auth").
    pub excess: bool,
    pub metrics: ExchangeMetrics,
}

#[derive(Clone)]
pub struct ExchangeState(pub Arc<Inner>);

impl ExchangeState {
    pub fn new(registry: Registry, auth: AuthGate, excess: bool) -> Self {
        Self(Arc::new(Inner {
            registry,
            auth,
            excess,
            metrics: ExchangeMetrics::new(),
        }))
    }
}

impl std::ops::Deref for ExchangeState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
