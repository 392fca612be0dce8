//! Engine error taxonomy (spec §9's explicit result variants).

use thiserror::Error;

/// Errors the engine can return to its caller (the HTTP façade).
///
/// Every variant here corresponds 1:1 to an entry in the client-facing
/// error taxonomy; the façade maps each to a status code and an error
/// string rather than inventing its own mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("bad type for field: {0}")]
    BadType(&'static str),

    #[error("bad value for field: {0}")]
    BadValue(&'static str),

    #[error("too many books")]
    TooManyBooks,

    #[error("no such venue")]
    NoSuchVenue,

    #[error("no such order")]
    NoSuchOrder,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
