//! Error types for YAML parsing with source locations.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for hearth-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error reported by the scanner or parser.
    #[error("{message}{}", describe_location(.location))]
    Parse {
        message: String,
        location: Option<SourceInfo>,
    },

    /// The event stream did not form a well-nested document.
    #[error("Invalid YAML structure: {message}{}", describe_location(.location))]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },
}

impl Error {
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            Error::Parse { location, .. } | Error::InvalidStructure { location, .. } => {
                location.as_ref()
            }
        }
    }

    /// Replace the file name carried by this error's location.
    pub fn relabel(mut self, file: &str) -> Self {
        match &mut self {
            Error::Parse { location, .. } | Error::InvalidStructure { location, .. } => {
                if let Some(location) = location {
                    location.file = Some(file.to_string());
                }
            }
        }
        self
    }

    pub(crate) fn from_scan(err: &yaml_rust2::ScanError, filename: Option<&str>) -> Self {
        let mut location = SourceInfo::from_marker(err.marker(), 0);
        location.file = filename.map(str::to_string);
        Error::Parse {
            message: err.info().to_string(),
            location: Some(location),
        }
    }
}

fn describe_location(location: &Option<SourceInfo>) -> String {
    match location {
        Some(loc) => match &loc.file {
            Some(file) => format!(" in \"{}\", line {}, column {}", file, loc.line, loc.col),
            None => format!(" at line {}, column {}", loc.line, loc.col),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_file() {
        let err = Error::Parse {
            message: "mapping values are not allowed in this context".into(),
            location: Some(SourceInfo::new(Some("configuration.yaml".into()), 4, 2, 5, 0)),
        };
        assert_eq!(
            err.to_string(),
            "mapping values are not allowed in this context in \"configuration.yaml\", line 2, column 5"
        );
    }

    #[test]
    fn test_relabel() {
        let err = Error::Parse {
            message: "bad".into(),
            location: Some(SourceInfo::new(Some("/srv/conf/configuration.yaml".into()), 0, 1, 1, 0)),
        }
        .relabel("configuration.yaml");
        assert_eq!(
            err.location().and_then(|l| l.file.as_deref()),
            Some("configuration.yaml")
        );
    }
}
