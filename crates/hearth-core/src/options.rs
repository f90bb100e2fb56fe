//! Options controlling a configuration check.

use crate::consts::MAX_VALIDATION_ERROR_ITEM_LENGTH;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Turn domain and core failures into an error instead of reporting them
    pub raise_on_failure: bool,

    /// Longest rendering of an offending value in messages
    pub max_value_length: usize,

    /// How many domains are validated at once
    pub concurrency: usize,

    /// Do not process the core section
    pub skip_core: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            raise_on_failure: false,
            max_value_length: MAX_VALIDATION_ERROR_ITEM_LENGTH,
            concurrency: 8,
            skip_core: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_keep_defaults() {
        let options: CheckOptions = serde_json::from_str(r#"{"raise_on_failure": true}"#).unwrap();
        assert!(options.raise_on_failure);
        assert_eq!(options.max_value_length, 500);
        assert_eq!(options.concurrency, 8);
        assert!(!options.skip_core);
    }
}
