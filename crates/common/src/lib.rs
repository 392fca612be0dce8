//! Common types and utilities for the exchange workspace.
//!
//! This crate provides the shared error type used by glue code (CLI
//! parsing, configuration loading) outside the client-facing HTTP error
//! taxonomy, which lives in `exchange-engine`.
//!
//! # Modules
//!
//! - [`error`] - Common error type

pub mod error;

pub use error::{Error, Result};
