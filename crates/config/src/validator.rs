//! Validation report for [`crate::settings::ExchangeSettings`].
//!
//! Errors are fatal (the binary should refuse to start); warnings are
//! surfaced to the operator but do not block startup.

use thiserror::Error;

use crate::settings::ExchangeSettings;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("venue name must not be empty")]
    EmptyVenue,

    #[error("symbol name must not be empty")]
    EmptySymbol,

    #[error("http port and websocket port must differ, both are {0}")]
    PortCollision(u16),

    #[error("accounts file does not exist: {0}")]
    AccountsFileMissing(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

pub fn validate_settings(settings: &ExchangeSettings) -> ValidationReport {
    let mut report = ValidationReport::new();

    if settings.venue.trim().is_empty() {
        report.add_error(ValidationError::EmptyVenue);
    }
    if settings.symbol.trim().is_empty() {
        report.add_error(ValidationError::EmptySymbol);
    }
    if settings.websocket && settings.http_port == settings.ws_port {
        report.add_error(ValidationError::PortCollision(settings.http_port));
    }
    if let Some(path) = &settings.accounts_path {
        if !path.exists() {
            report.add_error(ValidationError::AccountsFileMissing(
                path.display().to_string(),
            ));
        }
    } else {
        report.add_warning(
            "accounts_path",
            "no accounts file supplied, starting in open (no-auth) mode",
        );
    }
    if settings.excess && settings.accounts_path.is_none() {
        report.add_warning(
            "excess",
            "excess-response endpoints enabled without an accounts file; all-orders reads are unauthenticated",
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base() -> ExchangeSettings {
        ExchangeSettings {
            maxbooks: 0,
            venue: "TESTEX".into(),
            symbol: "FOOBAR".into(),
            accounts_path: None,
            http_port: 8000,
            excess: false,
            websocket: false,
            ws_port: 8001,
            log_format: "pretty".into(),
        }
    }

    #[test]
    fn open_mode_without_accounts_is_a_warning_not_an_error() {
        let report = base().validate();
        assert!(report.is_valid());
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn empty_venue_is_fatal() {
        let mut settings = base();
        settings.venue = "".into();
        let report = settings.validate();
        assert!(!report.is_valid());
        assert!(report.errors.contains(&ValidationError::EmptyVenue));
    }

    #[test]
    fn colliding_ports_is_fatal_when_websocket_enabled() {
        let mut settings = base();
        settings.websocket = true;
        settings.ws_port = settings.http_port;
        let report = settings.validate();
        assert!(!report.is_valid());
    }

    #[test]
    fn missing_accounts_file_is_fatal() {
        let mut settings = base();
        settings.accounts_path = Some(PathBuf::from("/nonexistent/accounts.json"));
        let report = settings.validate();
        assert!(!report.is_valid());
    }
}
