//! Auth gate (C8): static account -> API key map.
//!
//! Dual-header support (`X-Starfighter-Authorization` preferred,
//! `X-Stockfighter-Authorization` fallback) is grounded on the original
//! Python implementation's `api_key_from_headers()`
//! (`examples/original_source/disorderBook_main.py`).

use std::collections::HashMap;

pub const PRIMARY_HEADER: &str = "X-Starfighter-Authorization";
pub const FALLBACK_HEADER: &str = "X-Stockfighter-Authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No key supplied at all.
    NoApiKey,
    /// A key was supplied but doesn't match the account's stored key.
    Mismatch,
}

/// Immutable account -> API key map, loaded once at startup (§4.7).
#[derive(Debug, Clone)]
pub struct AuthGate {
    keys: HashMap<String, String>,
}

impl AuthGate {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    /// Open mode (no accounts file supplied): everything is permitted.
    pub fn is_open(&self) -> bool {
        self.keys.is_empty()
    }

    /// Checks a header-supplied key against the account's stored key.
    /// Always succeeds in open mode.
    pub fn check(&self, account: &str, supplied_key: Option<&str>) -> Result<(), AuthError> {
        if self.is_open() {
            return Ok(());
        }
        let Some(key) = supplied_key else {
            return Err(AuthError::NoApiKey);
        };
        match self.keys.get(account) {
            Some(expected) if expected == key => Ok(()),
            _ => Err(AuthError::Mismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_mode_permits_everything() {
        let gate = AuthGate::new(HashMap::new());
        assert!(gate.is_open());
        assert_eq!(gate.check("anyone", None), Ok(()));
    }

    #[test]
    fn matching_key_succeeds() {
        let mut keys = HashMap::new();
        keys.insert("A".to_string(), "secret".to_string());
        let gate = AuthGate::new(keys);
        assert_eq!(gate.check("A", Some("secret")), Ok(()));
    }

    #[test]
    fn missing_key_is_no_api_key() {
        let mut keys = HashMap::new();
        keys.insert("A".to_string(), "secret".to_string());
        let gate = AuthGate::new(keys);
        assert_eq!(gate.check("A", None), Err(AuthError::NoApiKey));
    }

    #[test]
    fn wrong_key_is_mismatch() {
        let mut keys = HashMap::new();
        keys.insert("A".to_string(), "secret".to_string());
        let gate = AuthGate::new(keys);
        assert_eq!(gate.check("A", Some("wrong")), Err(AuthError::Mismatch));
    }

    #[test]
    fn unknown_account_with_a_key_is_mismatch() {
        let mut keys = HashMap::new();
        keys.insert("A".to_string(), "secret".to_string());
        let gate = AuthGate::new(keys);
        assert_eq!(gate.check("unknown", Some("secret")), Err(AuthError::Mismatch));
    }
}
