//! Error code catalog and lookup.
//!
//! Maps error codes (like "H-3-3") to their metadata: subsystem, title,
//! message template and documentation URL.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "document", "packages", "validation")
    pub subsystem: String,

    pub title: String,

    /// Default message template (may include placeholders)
    pub message_template: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,

    /// When this error was introduced (version)
    pub since_version: String,
}

/// Global error catalog, embedded at compile time from `error_catalog.json`.
///
/// # Panics
///
/// Panics on first access if the embedded JSON is invalid.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in hearth")
});

/// Look up error code information.
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Documentation URL for an error code.
///
/// ```
/// use hearth_error_reporting::catalog::get_docs_url;
///
/// assert_eq!(get_docs_url("H-3-3"), Some("https://hearth.dev/docs/errors/H-3-3"));
/// ```
pub fn get_docs_url(code: &str) -> Option<&str> {
    ERROR_CATALOG
        .get(code)
        .and_then(|info| info.docs_url.as_deref())
}

pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_validation_codes_are_contiguous() {
        for n in 1..=11 {
            let code = format!("H-3-{}", n);
            assert_eq!(get_subsystem(&code), Some("validation"), "{}", code);
        }
    }

    #[test]
    fn test_nonexistent_code() {
        assert!(get_error_info("H-999-999").is_none());
        assert!(get_docs_url("H-999-999").is_none());
    }
}
