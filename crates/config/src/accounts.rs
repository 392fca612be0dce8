//! Loading the accounts file: a JSON object mapping account name to API key.

use std::collections::HashMap;
use std::path::Path;

use common::Error;

/// account -> api-key
pub type AccountMap = HashMap<String, String>;

/// Load and parse the accounts file.
///
/// The file must be a JSON object whose values are all strings; any other
/// shape (array, nested object, non-string value) is rejected rather than
/// silently coerced.
pub fn load_accounts_file(path: &Path) -> common::Result<AccountMap> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("reading accounts file {}: {e}", path.display())))?;

    let map: AccountMap = serde_json::from_str(&contents)
        .map_err(|e| Error::config(format!("parsing accounts file {}: {e}", path.display())))?;

    tracing::info!(count = map.len(), path = %path.display(), "loaded accounts file");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_accounts_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"A": "key-a", "B": "key-b"}}"#).unwrap();

        let accounts = load_accounts_file(file.path()).unwrap();
        assert_eq!(accounts.get("A"), Some(&"key-a".to_string()));
        assert_eq!(accounts.get("B"), Some(&"key-b".to_string()));
    }

    #[test]
    fn rejects_non_object_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["A", "B"]"#).unwrap();

        assert!(load_accounts_file(file.path()).is_err());
    }

    #[test]
    fn rejects_missing_file() {
        assert!(load_accounts_file(Path::new("/nonexistent/accounts.json")).is_err());
    }
}
