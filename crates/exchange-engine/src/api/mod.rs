//! HTTP façade (§11): axum handlers sitting directly on the engine.
//!
//! Routing and JSON encoding are "external collaborators" per spec.md
//! §1 — this module is where that collaborator actually lives, kept
//! deliberately thin: every handler's job is to coerce a loosely-typed
//! request into a strongly-typed call into [`crate::book`]/
//! [`crate::registry`]/[`crate::auth`], then serialize the result.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::ExchangeState;
