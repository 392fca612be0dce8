//! Settings and accounts-file loading for the exchange binary.
//!
//! # Modules
//!
//! - [`settings`] - parsed, validated exchange settings
//! - [`accounts`] - JSON accounts-file loader (account -> API key)
//! - [`validator`] - [`ValidationReport`] used by [`settings::ExchangeSettings::validate`]

pub mod accounts;
pub mod settings;
pub mod validator;

pub use accounts::{load_accounts_file, AccountMap};
pub use settings::ExchangeSettings;
pub use validator::{ValidationError, ValidationReport};
