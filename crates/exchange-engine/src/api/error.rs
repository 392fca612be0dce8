//! Client-facing error taxonomy and its status-code mapping (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use crate::auth::AuthError;
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub enum ApiError {
    BadJson(String),
    MissingField(String),
    BadType(String),
    BadValue(String),
    UrlMismatch,
    BookLimitExceeded,
    NoSuchVenue,
    NoSuchOrder,
    NoApiKey,
    AuthFailure,
    EndpointDisabled,
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadJson(_)
            | ApiError::MissingField(_)
            | ApiError::BadType(_)
            | ApiError::BadValue(_)
            | ApiError::UrlMismatch
            | ApiError::BookLimitExceeded => StatusCode::BAD_REQUEST,
            ApiError::NoApiKey | ApiError::AuthFailure => StatusCode::UNAUTHORIZED,
            ApiError::EndpointDisabled => StatusCode::FORBIDDEN,
            ApiError::NoSuchVenue | ApiError::NoSuchOrder => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadJson(msg) => format!("bad-json: {msg}"),
            ApiError::MissingField(field) => format!("missing-field: {field}"),
            ApiError::BadType(field) => format!("bad-type: {field}"),
            ApiError::BadValue(field) => format!("bad-value: {field}"),
            ApiError::UrlMismatch => "url-mismatch".to_string(),
            ApiError::BookLimitExceeded => "book-limit-exceeded".to_string(),
            ApiError::NoSuchVenue => "no-such-venue".to_string(),
            ApiError::NoSuchOrder => "no-such-order".to_string(),
            ApiError::NoApiKey => "no-api-key".to_string(),
            ApiError::AuthFailure => "auth-failure".to_string(),
            ApiError::EndpointDisabled => "endpoint-disabled".to_string(),
            ApiError::Internal(msg) => format!("internal: {msg}"),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MissingField(f) => ApiError::MissingField(f.to_string()),
            EngineError::BadType(f) => ApiError::BadType(f.to_string()),
            EngineError::BadValue(f) => ApiError::BadValue(f.to_string()),
            EngineError::TooManyBooks => ApiError::BookLimitExceeded,
            EngineError::NoSuchVenue => ApiError::NoSuchVenue,
            EngineError::NoSuchOrder => ApiError::NoSuchOrder,
            EngineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NoApiKey => ApiError::NoApiKey,
            AuthError::Mismatch => ApiError::AuthFailure,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        tracing::warn!(status = %status, error = %self.message(), "request failed");
        (status, Json(json!({"ok": false, "error": self.message()}))).into_response()
    }
}
